use rand::{Rng, seq::SliceRandom};

use crate::models::Track;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Order {
    #[default]
    Natural,
    /// Indices into the natural track list, in play order.
    Shuffled(Vec<usize>),
}

/// Tracks in their natural order plus the order they are played in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    tracks: Vec<Track>,
    order: Order,
}

impl Queue {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            order: Order::Natural,
        }
    }

    pub fn natural(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_shuffled(&self) -> bool {
        matches!(self.order, Order::Shuffled(_))
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn active_len(&self) -> usize {
        self.tracks.len()
    }

    /// Track at `index` in the active order.
    pub fn get(&self, index: usize) -> Option<&Track> {
        match &self.order {
            Order::Natural => self.tracks.get(index),
            Order::Shuffled(permutation) => permutation
                .get(index)
                .and_then(|natural| self.tracks.get(*natural)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        (0..self.active_len()).filter_map(|index| self.get(index))
    }

    pub fn active_tracks(&self) -> Vec<Track> {
        self.iter().cloned().collect()
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut permutation: Vec<usize> = (0..self.tracks.len()).collect();
        permutation.shuffle(rng);
        self.order = Order::Shuffled(permutation);
    }

    pub fn unshuffle(&mut self) {
        self.order = Order::Natural;
    }

    /// Inserts `track` at `index` of the active order and returns the index
    /// it actually landed on.
    ///
    /// While shuffled the track is appended to the natural list, so it ends up
    /// last once the queue is unshuffled.
    pub fn insert(&mut self, index: usize, track: Track) -> usize {
        let index = index.min(self.active_len());

        match &mut self.order {
            Order::Natural => self.tracks.insert(index, track),
            Order::Shuffled(permutation) => {
                permutation.insert(index, self.tracks.len());
                self.tracks.push(track);
            }
        }

        index
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.order = Order::Natural;
    }
}
