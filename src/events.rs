//! Event types for voicegate

use crate::asset::AssetKey;
use crate::source::SourceKey;

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// The emitter acquired a voice and started playing.
    SourceStarted { source: SourceKey },
    /// A looping emitter became inaudible and gave its voice back.
    SourceSuspended { source: SourceKey },
    /// A non-looping emitter reached the end of its buffer.
    SourceCompleted { source: SourceKey },
    /// The emitter was stopped and evicted.
    SourceStopped { source: SourceKey },
    AssetLoadFailed { asset: AssetKey, error: String },
    /// The backend could not be initialized; the scheduler runs silently.
    BackendUnavailable { error: String },
}

impl SchedulerEvent {
    pub fn source(&self) -> Option<SourceKey> {
        match self {
            Self::SourceStarted { source }
            | Self::SourceSuspended { source }
            | Self::SourceCompleted { source }
            | Self::SourceStopped { source } => Some(*source),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::AssetLoadFailed { .. } | Self::BackendUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_helpers() {
        let mut sources: SlotMap<SourceKey, ()> = SlotMap::with_key();
        let key = sources.insert(());
        let started = SchedulerEvent::SourceStarted { source: key };
        assert_eq!(started.source(), Some(key));
        assert!(!started.is_error());

        let failed = SchedulerEvent::BackendUnavailable {
            error: "no device".to_string(),
        };
        assert_eq!(failed.source(), None);
        assert!(failed.is_error());
    }
}
