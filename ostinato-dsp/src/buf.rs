// Ostinato
// Copyright (c) 2026 The Project Ostinato Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `buf` module provides an owned planar audio buffer for callers of the conversion engine.

use smallvec::SmallVec;

/// The maximum number of audio plane slices that will be stored on the stack before storing the
/// slices on the heap.
const MAX_STACK_PLANE_SLICES: usize = 8; // Upto 7.1 audio.

/// A fixed-size container for multi-channel planar floating point audio.
///
/// `PlanarBuffer` stores each audio channel in a separate audio plane. An audio plane is a
/// contiguous vector of samples. The samples across all audio planes at any one particular index
/// form an audio frame.
///
/// The conversion engine operates on borrowed plane slices and never allocates. `PlanarBuffer`
/// exists for callers that need to own the planes handed to the engine: it allocates once on
/// instantiation and never again.
#[derive(Clone, Default)]
pub struct PlanarBuffer {
    planes: SmallVec<[Vec<f32>; 3]>, // Keep on-stack upto 2.1 audio.
    num_frames: usize,
}

impl PlanarBuffer {
    /// Instantiate a new `PlanarBuffer` with the given number of channels and frames. All samples
    /// are initialized to silence.
    pub fn new(num_channels: usize, num_frames: usize) -> Self {
        assert!(num_channels > 0, "buffer must have at least one channel");

        // As a matter of practicality, it is not possible to allocate more than usize::MAX bytes
        // of audio samples.
        assert!(
            num_frames <= usize::MAX / (std::mem::size_of::<f32>() * num_channels),
            "capacity too large"
        );

        let mut planes = SmallVec::<[Vec<f32>; 3]>::with_capacity(num_channels);

        planes.resize_with(num_channels, || vec![0.0; num_frames]);

        PlanarBuffer { planes, num_frames }
    }

    /// Get the number of channels.
    pub fn num_channels(&self) -> usize {
        self.planes.len()
    }

    /// Get the number of frames per audio plane.
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Get an immutable reference to the audio plane for the given channel.
    pub fn plane(&self, ch: usize) -> &[f32] {
        &self.planes[ch]
    }

    /// Get a mutable reference to the audio plane for the given channel.
    pub fn plane_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.planes[ch]
    }

    /// Get immutable slices of all audio planes in channel order.
    pub fn planes(&self) -> SmallVec<[&[f32]; MAX_STACK_PLANE_SLICES]> {
        self.planes.iter().map(|plane| plane.as_slice()).collect()
    }

    /// Get mutable slices of all audio planes in channel order.
    pub fn planes_mut(&mut self) -> SmallVec<[&mut [f32]; MAX_STACK_PLANE_SLICES]> {
        self.planes.iter_mut().map(|plane| plane.as_mut_slice()).collect()
    }

    /// Set every sample of every audio plane to the given value.
    pub fn fill(&mut self, value: f32) {
        for plane in self.planes.iter_mut() {
            plane.fill(value);
        }
    }
}
