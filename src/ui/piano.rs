//! Piano strip widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Widget},
};

use crate::synth::{is_black_key, note_name, NoteId};

/// One column per note over a note range, held notes lit
pub struct Piano<'a> {
    low: NoteId,
    high: NoteId,
    held: &'a [NoteId],
    block: Option<Block<'a>>,
}

impl<'a> Piano<'a> {
    pub fn new(low: NoteId, high: NoteId, held: &'a [NoteId]) -> Self {
        Self {
            low,
            high,
            held,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn key_style(&self, note: NoteId) -> Style {
        if self.held.contains(&note) {
            Style::default().fg(Color::Yellow)
        } else if is_black_key(note) {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        }
    }

    fn draw(&self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 || self.high < self.low {
            return;
        }

        let count = ((self.high - self.low + 1) as usize).min(area.width as usize);
        let key_rows = area.height.saturating_sub(1).max(1);

        for i in 0..count {
            let note = self.low + i as NoteId;
            let x = area.x + i as u16;
            let style = self.key_style(note);
            for row in 0..key_rows {
                buf.set_string(x, area.y + row, "█", style);
            }
        }

        // Label the lowest note under the strip
        if area.height > 1 {
            let label = note_name(self.low);
            let width = (area.width as usize).min(label.len());
            buf.set_string(area.x, area.y + area.height - 1, &label[..width], Style::default());
        }
    }
}

impl Widget for Piano<'_> {
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
