use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    text: String,
    is_final: bool,
}

/// Recognition hypotheses keyed by segment index.
///
/// A final result replaces the partial text of its segment; later interim
/// results for an already-final segment are ignored.
#[derive(Debug, Clone, Default)]
pub struct TranscriptBuffer {
    segments: BTreeMap<usize, Segment>,
}

impl TranscriptBuffer {
    pub fn apply_interim(&mut self, segment: usize, text: &str) {
        match self.segments.get_mut(&segment) {
            Some(existing) if existing.is_final => {}
            Some(existing) => existing.text = text.to_string(),
            None => {
                self.segments.insert(
                    segment,
                    Segment {
                        text: text.to_string(),
                        is_final: false,
                    },
                );
            }
        }
    }

    pub fn apply_final(&mut self, segment: usize, text: &str) {
        self.segments.insert(
            segment,
            Segment {
                text: text.to_string(),
                is_final: true,
            },
        );
    }

    pub fn committed(&self) -> String {
        join(self.segments.values().filter(|segment| segment.is_final))
    }

    /// Committed text plus the current partial hypotheses.
    pub fn live(&self) -> String {
        join(self.segments.values())
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn join<'a>(segments: impl Iterator<Item = &'a Segment>) -> String {
    segments
        .map(|segment| segment.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
