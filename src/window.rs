//! Sliding window of normalized frames.
//!
//! Fixed-capacity ring addressed by a head index. Slots are reserved once at
//! construction so the per-frame path never reallocates.

use crate::error::WatchError;
use crate::frame::NormalizedFrame;

/// Bounded FIFO of the most recent `capacity` frames, oldest first.
pub struct FrameWindow {
    slots: Vec<Option<NormalizedFrame>>,
    /// Index of the oldest frame.
    head: usize,
    len: usize,
}

impl FrameWindow {
    pub fn new(capacity: usize) -> Result<Self, WatchError> {
        if capacity == 0 {
            return Err(WatchError::InvalidConfig(
                "frame window capacity must be at least 1".into(),
            ));
        }
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|e| WatchError::BufferAllocation(e.to_string()))?;
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots,
            head: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Insert at the tail, evicting (and dropping) the oldest frame when full.
    pub fn append(&mut self, frame: NormalizedFrame) {
        let capacity = self.capacity();
        if self.len == capacity {
            self.slots[self.head] = Some(frame);
            self.head = (self.head + 1) % capacity;
        } else {
            let tail = (self.head + self.len) % capacity;
            self.slots[tail] = Some(frame);
            self.len += 1;
        }
    }

    /// Read-only view of the current contents in chronological order.
    pub fn snapshot(&self) -> Vec<&NormalizedFrame> {
        let capacity = self.capacity();
        (0..self.len)
            .filter_map(|i| self.slots[(self.head + i) % capacity].as_ref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    /// 1x1 frame whose red channel encodes `tag / 255`.
    fn tagged(tag: u8) -> NormalizedFrame {
        NormalizedFrame::from_pixels(1, 1, vec![tag as f32 / 255.0, 0.0, 0.0])
            .expect("valid frame")
    }

    fn tags(window: &FrameWindow) -> Vec<u8> {
        window
            .snapshot()
            .iter()
            .map(|f| f.to_rgb8()[0])
            .collect()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            FrameWindow::new(0),
            Err(WatchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn fills_then_reports_full() -> Result<()> {
        let mut window = FrameWindow::new(3)?;
        assert!(window.is_empty());
        window.append(tagged(1));
        window.append(tagged(2));
        assert!(!window.is_full());
        window.append(tagged(3));
        assert!(window.is_full());
        assert_eq!(tags(&window), vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn keeps_most_recent_frames_in_order() -> Result<()> {
        let capacity = 20;
        let mut window = FrameWindow::new(capacity)?;
        for tag in 0..57u8 {
            window.append(tagged(tag));
            assert!(window.len() <= capacity);
            let expected: Vec<u8> =
                (tag.saturating_sub(capacity as u8 - 1)..=tag).collect();
            assert_eq!(tags(&window), expected);
        }
        assert_eq!(tags(&window).last(), Some(&56));
        Ok(())
    }

    #[test]
    fn snapshot_does_not_mutate() -> Result<()> {
        let mut window = FrameWindow::new(2)?;
        window.append(tagged(7));
        let first = tags(&window);
        let second = tags(&window);
        assert_eq!(first, second);
        assert_eq!(window.len(), 1);
        Ok(())
    }
}
