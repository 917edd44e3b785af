//! Oscilloscope widget for ratatui

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Widget},
};

/// Draws recent output as one min..max bar per column
pub struct Scope<'a> {
    samples: &'a [f32],
    style: Style,
    block: Option<Block<'a>>,
}

impl<'a> Scope<'a> {
    pub fn new(samples: &'a [f32]) -> Self {
        Self {
            samples,
            style: Style::default(),
            block: None,
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Smallest and largest sample falling into column `x` of `width`
    fn column_span(&self, x: usize, width: usize) -> (f32, f32) {
        let len = self.samples.len();
        let start = x * len / width;
        let end = ((x + 1) * len / width).max(start + 1).min(len);
        if start >= len {
            return (0.0, 0.0);
        }
        self.samples[start..end]
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)))
    }

    fn draw(&self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let height = area.height as i32;
        let center = area.y as i32 + height / 2;
        let half = (height / 2).max(1) as f32;
        let to_row = |v: f32| center - (v.clamp(-1.0, 1.0) * half).round() as i32;
        let bottom = area.y as i32 + height - 1;

        // Zero line first so the trace draws over it
        for x in area.x..area.x + area.width {
            buf.set_string(x, center as u16, "─", Style::default());
        }

        if self.samples.is_empty() {
            return;
        }

        for x in 0..width {
            let (lo, hi) = self.column_span(x, width);
            let top_row = to_row(hi).clamp(area.y as i32, bottom);
            let low_row = to_row(lo).clamp(area.y as i32, bottom);
            let screen_x = area.x + x as u16;
            for y in top_row..=low_row {
                buf.set_string(screen_x, y as u16, "│", self.style);
            }
        }
    }
}

impl Widget for Scope<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        self.draw(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(samples: &[f32], area: Rect) -> Buffer {
        let mut buf = Buffer::empty(area);
        Scope::new(samples).render(area, &mut buf);
        buf
    }

    #[test]
    fn test_scope_empty_draws_zero_line() {
        let area = Rect::new(0, 0, 10, 5);
        let buf = render(&[], area);
        assert_eq!(buf[(0, 2)].symbol(), "─");
        assert_eq!(buf[(9, 2)].symbol(), "─");
        assert_eq!(buf[(0, 0)].symbol(), " ");
    }

    #[test]
    fn test_scope_full_scale_reaches_edges() {
        // One column per pair, alternating +1/-1
        let samples = vec![1.0, -1.0, 1.0, -1.0];
        let area = Rect::new(0, 0, 2, 5);
        let buf = render(&samples, area);
        for y in 0..5 {
            assert_eq!(buf[(0, y)].symbol(), "│");
        }
    }

    #[test]
    fn test_scope_silence_stays_on_center() {
        let samples = vec![0.0; 20];
        let area = Rect::new(0, 0, 10, 5);
        let buf = render(&samples, area);
        assert_eq!(buf[(3, 2)].symbol(), "│");
        assert_eq!(buf[(3, 1)].symbol(), " ");
        assert_eq!(buf[(3, 3)].symbol(), " ");
    }

    #[test]
    fn test_scope_clips_out_of_range() {
        let samples = vec![4.0; 8];
        let area = Rect::new(0, 0, 4, 5);
        // Should not panic or draw outside the area
        let buf = render(&samples, area);
        assert_eq!(buf[(0, 0)].symbol(), "│");
    }

    #[test]
    fn test_scope_with_block() {
        let samples = vec![0.5; 10];
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        Scope::new(&samples)
            .block(Block::bordered().title("Scope"))
            .render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "┌");
    }
}
