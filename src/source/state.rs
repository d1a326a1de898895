use serde::Serialize;

/// Position of a refresh loop in its probe/load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RefreshState {
    Uninitialized = 0,
    Checking = 1,
    Loading = 2,
    Idle = 3,
    FailedProbe = 4,
    FailedLoad = 5,
}

impl RefreshState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => RefreshState::Checking,
            2 => RefreshState::Loading,
            3 => RefreshState::Idle,
            4 => RefreshState::FailedProbe,
            5 => RefreshState::FailedLoad,
            _ => RefreshState::Uninitialized,
        }
    }
}

/// Answer of a single data source. `NotReady` means no dataset has been loaded yet.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Ready(T),
    NotReady,
}

impl<T> Lookup<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Lookup::Ready(value) => Some(value),
            Lookup::NotReady => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_atomic_repr() {
        for state in [
            RefreshState::Uninitialized,
            RefreshState::Checking,
            RefreshState::Loading,
            RefreshState::Idle,
            RefreshState::FailedProbe,
            RefreshState::FailedLoad,
        ] {
            assert_eq!(RefreshState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_state_serializes_upper_snake() {
        let json = serde_json::to_string(&RefreshState::FailedProbe).unwrap();
        assert_eq!(json, "\"FAILED_PROBE\"");
    }
}
