use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::map::geo::normalize_longitude;
use crate::map::{LatLngAltitude, MapSurface};

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// 单帧环绕步进：经度向西递减，纬度与高度保持不变。
pub fn orbit_step(
    center: LatLngAltitude,
    degrees_per_second: f64,
    elapsed: Duration,
) -> LatLngAltitude {
    let delta_lng = degrees_per_second * elapsed.as_secs_f64();
    LatLngAltitude {
        lng: normalize_longitude(center.lng - delta_lng),
        ..center
    }
}

/// 正在运行的环绕循环。丢弃即取消。
pub struct OrbitHandle {
    token: u64,
    degrees_per_second: f64,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for OrbitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrbitHandle")
            .field("token", &self.token)
            .field("degrees_per_second", &self.degrees_per_second)
            .finish_non_exhaustive()
    }
}

impl OrbitHandle {
    pub(super) fn spawn(
        runtime: &Handle,
        token: u64,
        surface: Arc<dyn MapSurface>,
        degrees_per_second: f64,
        frame_interval: Duration,
    ) -> Self {
        let period = frame_interval.max(MIN_FRAME_INTERVAL);
        let task = runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_frame = Instant::now();

            loop {
                ticker.tick().await;
                let now = Instant::now();
                let elapsed = now.duration_since(last_frame);
                last_frame = now;

                let pose = surface.camera();
                surface.set_center(orbit_step(pose.center, degrees_per_second, elapsed));
            }
        });

        Self {
            token,
            degrees_per_second,
            task: Some(task),
        }
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn degrees_per_second(&self) -> f64 {
        self.degrees_per_second
    }
}

impl Drop for OrbitHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
