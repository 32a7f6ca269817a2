//! 相机动画：持续环绕与一次性飞行过渡。
//!
//! 全局最多只有一个环绕循环，由 `OrbitHandle` 持有；所有取消路径都经过该句柄。

mod orbit;

pub use orbit::{orbit_step, OrbitHandle};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::CameraConfig;
use crate::map::{CameraPose, LatLngAltitude, MapSurface};
use crate::telemetry::events::record_orbit;
use crate::util::lock;

/// `toggle_space_view` 选择的方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceViewTransition {
    Entering,
    Returning,
}

#[derive(Clone)]
pub struct CameraAnimator {
    inner: Arc<AnimatorInner>,
}

struct AnimatorInner {
    surface: Arc<dyn MapSurface>,
    config: CameraConfig,
    runtime: Option<Handle>,
    orbit: Mutex<Option<OrbitHandle>>,
    settle: Mutex<Option<JoinHandle<()>>>,
    saved_pose: Mutex<Option<CameraPose>>,
    next_token: AtomicU64,
}

impl std::fmt::Debug for CameraAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraAnimator")
            .field("config", &self.inner.config)
            .field("orbiting", &self.is_orbiting())
            .finish_non_exhaustive()
    }
}

impl CameraAnimator {
    /// Uses the runtime of the calling context, if any, for the orbit and
    /// settle tasks.
    pub fn new(surface: Arc<dyn MapSurface>, config: CameraConfig) -> Self {
        Self::with_runtime(surface, config, Handle::try_current().ok())
    }

    /// Spawns through `runtime`, so the sync methods are safe to call from
    /// threads outside any tokio context (host UI callbacks).
    pub fn with_runtime(
        surface: Arc<dyn MapSurface>,
        config: CameraConfig,
        runtime: Option<Handle>,
    ) -> Self {
        Self {
            inner: Arc::new(AnimatorInner {
                surface,
                config,
                runtime,
                orbit: Mutex::new(None),
                settle: Mutex::new(None),
                saved_pose: Mutex::new(None),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.inner.config
    }

    pub fn surface(&self) -> Arc<dyn MapSurface> {
        Arc::clone(&self.inner.surface)
    }

    /// 以配置中的默认速率开始环绕。
    pub fn start_orbit(&self) -> Option<u64> {
        self.start_orbit_at(self.inner.config.orbit_degrees_per_second)
    }

    /// Starts the orbit loop and returns its token. Already orbiting is a no-op
    /// that returns the running loop's token. `None` without a tokio runtime.
    pub fn start_orbit_at(&self, degrees_per_second: f64) -> Option<u64> {
        let mut guard = lock(&self.inner.orbit);
        if let Some(handle) = guard.as_ref() {
            debug!(
                target: "camera_animator",
                token = handle.token(),
                "orbit already active"
            );
            return Some(handle.token());
        }

        let runtime = self.runtime()?;
        let token = self.inner.next_token.fetch_add(1, Ordering::SeqCst);
        let handle = OrbitHandle::spawn(
            &runtime,
            token,
            Arc::clone(&self.inner.surface),
            degrees_per_second,
            self.inner.config.frame_interval,
        );
        *guard = Some(handle);
        drop(guard);

        record_orbit("started", degrees_per_second);
        Some(token)
    }

    /// Cancels the orbit loop and any pending space-view settle timer.
    /// Returns whether an orbit loop was running.
    pub fn stop_orbit(&self) -> bool {
        if let Some(pending) = lock(&self.inner.settle).take() {
            pending.abort();
        }

        let handle = lock(&self.inner.orbit).take();
        match handle {
            Some(handle) => {
                let rate = handle.degrees_per_second();
                drop(handle);
                record_orbit("stopped", rate);
                true
            }
            None => false,
        }
    }

    pub fn is_orbiting(&self) -> bool {
        lock(&self.inner.orbit).is_some()
    }

    pub fn orbit_token(&self) -> Option<u64> {
        lock(&self.inner.orbit).as_ref().map(OrbitHandle::token)
    }

    /// 一次性飞行，由地图引擎负责插值，不阻塞调用方。
    pub fn fly_to(&self, pose: CameraPose, duration: Duration) {
        debug!(
            target: "camera_animator",
            lat = pose.center.lat,
            lng = pose.center.lng,
            range = pose.range,
            duration_ms = duration.as_millis() as u64,
            "issuing camera flight"
        );
        self.inner.surface.fly_camera_to(pose, duration);
    }

    pub fn is_in_space(&self) -> bool {
        self.is_space_range(self.inner.surface.camera().range)
    }

    pub fn saved_pose(&self) -> Option<CameraPose> {
        *lock(&self.inner.saved_pose)
    }

    pub fn toggle_space_view(&self) -> SpaceViewTransition {
        let current = self.inner.surface.camera();
        self.stop_orbit();

        if self.is_space_range(current.range) {
            let target = self
                .saved_pose()
                .unwrap_or(self.inner.config.home_pose);
            info!(
                target: "camera_animator",
                restored = self.saved_pose().is_some(),
                "leaving space view"
            );
            self.fly_to(target, self.inner.config.leave_space_duration);
            return SpaceViewTransition::Returning;
        }

        *lock(&self.inner.saved_pose) = Some(current);
        let globe = CameraPose {
            center: LatLngAltitude::new(0.0, current.center.lng, 0.0),
            heading: 0.0,
            tilt: 0.0,
            range: self.inner.config.globe_range,
        };
        info!(target: "camera_animator", "entering space view");
        self.fly_to(globe, self.inner.config.enter_space_duration);
        self.schedule_orbit_after_settle();
        SpaceViewTransition::Entering
    }

    // The engine gives no completion signal for flights, so wait the nominal
    // duration plus a margin and only orbit if the camera really is out there.
    fn schedule_orbit_after_settle(&self) {
        let Some(runtime) = self.runtime() else {
            return;
        };
        let animator = self.clone();
        let wait = self.inner.config.enter_space_duration + self.inner.config.settle_margin;
        let pending = runtime.spawn(async move {
            sleep(wait).await;
            if animator.is_in_space() {
                animator.start_orbit();
            } else {
                debug!(
                    target: "camera_animator",
                    "camera left globe range before settling; orbit skipped"
                );
            }
        });

        if let Some(previous) = lock(&self.inner.settle).replace(pending) {
            previous.abort();
        }
    }

    fn runtime(&self) -> Option<Handle> {
        let runtime = self
            .inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok());
        if runtime.is_none() {
            warn!(target: "camera_animator", "no tokio runtime; camera animation skipped");
        }
        runtime
    }

    fn is_space_range(&self, range: f64) -> bool {
        range > self.inner.config.space_range_threshold
    }
}
