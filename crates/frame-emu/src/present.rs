//! Committed-frame snapshots and window compositing.
//!
//! The presentation thread never reads the live frame buffer while drawing.
//! On each tick it asks the display for a pending commit and, if there is
//! one, copies the buffer out under the same lock. Everything after that
//! works on the private copy.

use frame_display::Rgb;

use crate::host::Host;

/// Fill colour for the letterbox bars.
pub const BACKGROUND: Rgb = Rgb::new(30, 30, 30);

/// Where the logical frame lands inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Largest aspect-preserving fit of `src` inside `dst`, centered.
    ///
    /// When the window can hold at least one full copy the scale is a whole
    /// number so pixels stay square. Smaller windows get a fractional
    /// downscale.
    #[must_use]
    pub fn fit(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Self {
        let (width, height) = if dst_w >= src_w && dst_h >= src_h {
            let factor = (dst_w / src_w).min(dst_h / src_h);
            (src_w * factor, src_h * factor)
        } else {
            let scale =
                (f64::from(dst_w) / f64::from(src_w)).min(f64::from(dst_h) / f64::from(src_h));
            (
                ((f64::from(src_w) * scale) as u32).clamp(1, dst_w.max(1)),
                ((f64::from(src_h) * scale) as u32).clamp(1, dst_h.max(1)),
            )
        };
        Self {
            x: (dst_w.saturating_sub(width)) / 2,
            y: (dst_h.saturating_sub(height)) / 2,
            width,
            height,
        }
    }

    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Nearest-neighbour blit of an ARGB32 frame into an RGBA8 target,
/// letterboxed with [`BACKGROUND`].
pub fn composite(
    src: &[u32],
    src_w: u32,
    src_h: u32,
    dst: &mut [u8],
    dst_w: u32,
    dst_h: u32,
) -> Viewport {
    let view = Viewport::fit(src_w, src_h, dst_w, dst_h);
    if dst_w == 0 || dst_h == 0 {
        return view;
    }
    let bg = [BACKGROUND.r, BACKGROUND.g, BACKGROUND.b, 0xFF];

    // Source column for every target column inside the viewport.
    let columns: Vec<usize> = (0..view.width)
        .map(|dx| (u64::from(dx) * u64::from(src_w) / u64::from(view.width)) as usize)
        .collect();

    for (dy, row) in dst.chunks_exact_mut(dst_w as usize * 4).take(dst_h as usize).enumerate() {
        let dy = dy as u32;
        if dy < view.y || dy >= view.y + view.height {
            for px in row.chunks_exact_mut(4) {
                px.copy_from_slice(&bg);
            }
            continue;
        }
        let sy = (u64::from(dy - view.y) * u64::from(src_h) / u64::from(view.height)) as usize;
        let src_row = &src[sy * src_w as usize..(sy + 1) * src_w as usize];
        for (dx, px) in row.chunks_exact_mut(4).enumerate() {
            let dx = dx as u32;
            if !view.contains(dx, dy) {
                px.copy_from_slice(&bg);
                continue;
            }
            let rgb = Rgb::from_argb(src_row[columns[(dx - view.x) as usize]]);
            px.copy_from_slice(&[rgb.r, rgb.g, rgb.b, 0xFF]);
        }
    }
    view
}

/// The presentation thread's private copy of the last committed frame.
pub struct Presenter {
    width: u32,
    height: u32,
    front: Vec<u32>,
    commits: u64,
}

impl Presenter {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            front: vec![Rgb::default().to_argb(); width as usize * height as usize],
            commits: 0,
        }
    }

    /// Take a pending commit, if any. Returns `true` when the front frame
    /// changed.
    pub fn tick(&mut self, host: &Host) -> bool {
        let mut display = host.lock_display();
        if !display.take_commit() {
            return false;
        }
        let pixels = display.framebuffer().pixels();
        if pixels.len() == self.front.len() {
            self.front.copy_from_slice(pixels);
        } else {
            self.width = display.width();
            self.height = display.height();
            self.front = pixels.to_vec();
        }
        drop(display);
        self.commits += 1;
        true
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of commits presented so far.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// ARGB32 pixels of the front frame.
    #[must_use]
    pub fn frame(&self) -> &[u32] {
        &self.front
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(Rgb::from_argb(self.front[(y * self.width + x) as usize]))
    }

    /// Composite the front frame into an RGBA8 window buffer.
    pub fn render(&self, dst: &mut [u8], dst_w: u32, dst_h: u32) -> Viewport {
        composite(&self.front, self.width, self.height, dst, dst_w, dst_h)
    }

    /// Front frame at logical resolution as RGBA8.
    #[must_use]
    pub fn to_rgba(&self) -> Vec<u8> {
        self.front
            .iter()
            .flat_map(|&argb| {
                let rgb = Rgb::from_argb(argb);
                [rgb.r, rgb.g, rgb.b, 0xFF]
            })
            .collect()
    }
}
