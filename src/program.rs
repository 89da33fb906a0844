//! Bank and program selection shared by every transport

use serde::{Deserialize, Serialize};

use crate::midi::CC_BANK_SELECT;

/// Current bank/program selection
///
/// Bank 0 selects the node's native wave set; bank N >= 1 selects FM patch
/// set N-1. Created at bank 0 / program 0 and never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramState {
    bank: u8,
    program: u8,
}

impl ProgramState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a control change. Only bank select is interpreted; other
    /// controllers are accepted and leave the state untouched.
    ///
    /// Returns `true` if the state changed.
    pub fn apply_control_change(&mut self, controller: u8, value: u8) -> bool {
        if controller != CC_BANK_SELECT {
            return false;
        }
        self.bank = value;
        true
    }

    pub fn apply_program_change(&mut self, value: u8) {
        self.program = value;
    }

    pub fn bank(&self) -> u8 {
        self.bank
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    /// Index into the FM patch bank, `None` while the native bank is selected
    pub fn fm_patch(&self) -> Option<u16> {
        match self.bank {
            0 => None,
            bank => Some((bank as u16 - 1) * 128 + self.program as u16),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = ProgramState::new();
        assert_eq!(state.bank(), 0);
        assert_eq!(state.program(), 0);
        assert_eq!(state.fm_patch(), None);
    }

    #[test]
    fn test_bank_select() {
        let mut state = ProgramState::new();
        assert!(state.apply_control_change(0, 2));
        assert_eq!(state.bank(), 2);
    }

    #[test]
    fn test_other_controllers_ignored() {
        let mut state = ProgramState::new();
        state.apply_program_change(9);
        for cc in [1u8, 7, 32, 64, 127] {
            assert!(!state.apply_control_change(cc, 5));
        }
        assert_eq!(state, {
            let mut expected = ProgramState::new();
            expected.apply_program_change(9);
            expected
        });
    }

    #[test]
    fn test_fm_patch_index() {
        let mut state = ProgramState::new();
        state.apply_control_change(0, 1);
        state.apply_program_change(5);
        assert_eq!(state.fm_patch(), Some(5));

        state.apply_control_change(0, 3);
        state.apply_program_change(127);
        assert_eq!(state.fm_patch(), Some(2 * 128 + 127));
    }
}
