//! Round-robin voice allocation

use serde::Serialize;

/// Default number of voices per node
pub const DEFAULT_VOICES: usize = 4;

/// Fixed-size voice table with a round-robin cursor
///
/// Each slot remembers the last note assigned to it. Slots are never cleared:
/// the table answers "which note was this voice last given", not "is it
/// still sounding". A new note-on always takes the next slot, stealing
/// whatever it held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceAllocator {
    slots: Vec<Option<u8>>,
    next_voice: usize,
}

impl VoiceAllocator {
    /// Create a table with `voices` slots. A zero count is raised to one so
    /// that the cursor arithmetic always has a slot to land on.
    pub fn new(voices: usize) -> Self {
        Self {
            slots: vec![None; voices.max(1)],
            next_voice: 0,
        }
    }

    /// Claim the next voice for `note` and advance the cursor
    pub fn allocate(&mut self, note: u8) -> usize {
        let voice = self.next_voice;
        self.slots[voice] = Some(note);
        self.next_voice = (voice + 1) % self.slots.len();
        voice
    }

    /// Every voice whose last assigned note is `note`, in ascending order
    pub fn resolve_note_off(&self, note: u8) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(_, slot)| **slot == Some(note))
            .map(|(voice, _)| voice)
    }

    pub fn voices(&self) -> usize {
        self.slots.len()
    }

    pub fn next_voice(&self) -> usize {
        self.next_voice
    }

    pub fn slots(&self) -> &[Option<u8>] {
        &self.slots
    }
}

impl Default for VoiceAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_VOICES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_round_robin_wraps() {
        let mut voices = VoiceAllocator::new(3);
        let assigned: Vec<usize> = (60..67).map(|n| voices.allocate(n)).collect();
        assert_eq!(assigned, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(voices.slots(), &[Some(66), Some(64), Some(65)]);
    }

    #[test]
    fn test_note_off_finds_duplicates() {
        let mut voices = VoiceAllocator::new(4);
        voices.allocate(60);
        voices.allocate(62);
        voices.allocate(60);

        let hits: Vec<usize> = voices.resolve_note_off(60).collect();
        assert_eq!(hits, vec![0, 2]);
        assert_eq!(voices.resolve_note_off(61).count(), 0);
    }

    #[test]
    fn test_note_off_does_not_clear() {
        let mut voices = VoiceAllocator::new(2);
        voices.allocate(48);
        assert_eq!(voices.resolve_note_off(48).count(), 1);
        assert_eq!(voices.resolve_note_off(48).count(), 1);
        assert_eq!(voices.slots()[0], Some(48));
    }

    #[test]
    fn test_note_zero_does_not_match_empty_slots() {
        let mut voices = VoiceAllocator::new(4);
        assert_eq!(voices.resolve_note_off(0).count(), 0);

        voices.allocate(0);
        let hits: Vec<usize> = voices.resolve_note_off(0).collect();
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn test_stolen_voice_no_longer_matches() {
        let mut voices = VoiceAllocator::new(1);
        voices.allocate(60);
        voices.allocate(72);
        assert_eq!(voices.resolve_note_off(60).count(), 0);
        assert_eq!(voices.resolve_note_off(72).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_zero_voices_clamped() {
        let mut voices = VoiceAllocator::new(0);
        assert_eq!(voices.voices(), 1);
        assert_eq!(voices.allocate(1), 0);
        assert_eq!(voices.allocate(2), 0);
    }

    proptest! {
        #[test]
        fn prop_strict_round_robin(v in 1usize..32, notes in prop::collection::vec(any::<u8>(), 0..200)) {
            let mut voices = VoiceAllocator::new(v);
            for (k, note) in notes.iter().enumerate() {
                let voice = voices.allocate(*note);
                prop_assert_eq!(voice, k % v);
                prop_assert!(voice < v);
            }
        }
    }
}
