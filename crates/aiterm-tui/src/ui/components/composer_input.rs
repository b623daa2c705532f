// Single-line command editor. Commands are one line, so newlines from paste
// are folded into spaces and the view scrolls horizontally instead of wrapping.
// Columns are terminal cells, so wide glyphs count twice.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposerInputState {
    text: String,
    // Byte offset, always on a char boundary.
    cursor: usize,
}

impl ComposerInputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the contents and park the cursor at the end.
    pub fn set_text(&mut self, text: &str) {
        self.text = fold_newlines(text);
        self.cursor = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn insert_char(&mut self, c: char) {
        let c = if c == '\n' || c == '\r' { ' ' } else { c };
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn insert_str(&mut self, s: &str) {
        let folded = fold_newlines(s);
        self.text.insert_str(self.cursor, &folded);
        self.cursor += folded.len();
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = self.prev_boundary(self.cursor);
        self.text.drain(prev..self.cursor);
        self.cursor = prev;
    }

    pub fn delete_forward(&mut self) {
        if self.cursor >= self.text.len() {
            return;
        }
        let next = self.next_boundary(self.cursor);
        self.text.drain(self.cursor..next);
    }

    /// Delete back to the start of the previous word.
    pub fn delete_word_back(&mut self) {
        let head = &self.text[..self.cursor];
        let trimmed = head.trim_end_matches(char::is_whitespace);
        let start = trimmed
            .rfind(char::is_whitespace)
            .map(|i| i + trimmed[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0);
        self.text.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.prev_boundary(self.cursor);
    }

    pub fn move_right(&mut self) {
        self.cursor = self.next_boundary(self.cursor);
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Display column of the cursor.
    pub fn cursor_col(&self) -> usize {
        self.text[..self.cursor].width()
    }

    /// The slice that fits in `width` cells with the cursor visible, plus the
    /// cursor column relative to that slice.
    pub fn visible(&self, width: usize) -> (String, u16) {
        let width = width.max(1);
        let cursor_cell = self.text[self.cursor..]
            .chars()
            .next()
            .map_or(1, |c| char_width(c).max(1));

        let mut col = self.cursor_col();
        let mut start = 0;
        let mut leading = self.text[..self.cursor].char_indices();
        while col + cursor_cell > width {
            let Some((i, c)) = leading.next() else { break };
            col -= char_width(c);
            start = i + c.len_utf8();
        }

        let mut used = 0;
        let shown: String = self.text[start..]
            .chars()
            .take_while(|&c| {
                used += char_width(c);
                used <= width
            })
            .collect();
        (shown, col as u16)
    }

    fn prev_boundary(&self, pos: usize) -> usize {
        self.text[..pos]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self, pos: usize) -> usize {
        self.text[pos..]
            .chars()
            .next()
            .map(|c| pos + c.len_utf8())
            .unwrap_or(self.text.len())
    }
}

fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

fn fold_newlines(s: &str) -> String {
    s.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::ComposerInputState;

    #[test]
    fn edits_in_the_middle() {
        let mut c = ComposerInputState::new();
        c.insert_str("lst files");
        c.move_home();
        c.move_right();
        c.insert_char('i');
        assert_eq!(c.text(), "list files");
        c.move_end();
        c.backspace();
        assert_eq!(c.text(), "list file");
        c.move_home();
        c.delete_forward();
        assert_eq!(c.text(), "ist file");
    }

    #[test]
    fn multibyte_cursor_moves_by_char() {
        let mut c = ComposerInputState::new();
        c.insert_str("héllo");
        c.move_left();
        c.move_left();
        c.move_left();
        c.backspace();
        assert_eq!(c.text(), "hllo");
        assert_eq!(c.cursor_col(), 1);
    }

    #[test]
    fn paste_folds_newlines() {
        let mut c = ComposerInputState::new();
        c.insert_str("find adi.c\nand open it");
        assert_eq!(c.text(), "find adi.c and open it");
        c.set_text("go to\r\ndownloads");
        assert_eq!(c.text(), "go to downloads");
        assert_eq!(c.cursor_col(), 15);
    }

    #[test]
    fn delete_word_back_stops_at_whitespace() {
        let mut c = ComposerInputState::new();
        c.set_text("open config.json  ");
        c.delete_word_back();
        assert_eq!(c.text(), "open ");
        c.delete_word_back();
        assert_eq!(c.text(), "");
    }

    #[test]
    fn visible_window_keeps_cursor_in_view() {
        let mut c = ComposerInputState::new();
        c.set_text("abcdefghij");
        let (shown, col) = c.visible(4);
        assert_eq!(shown, "hij");
        assert_eq!(col, 3);

        c.move_home();
        let (shown, col) = c.visible(4);
        assert_eq!(shown, "abcd");
        assert_eq!(col, 0);
    }

    #[test]
    fn wide_glyphs_take_two_cells() {
        let mut c = ComposerInputState::new();
        c.set_text("ab日本");
        assert_eq!(c.cursor_col(), 6);

        c.set_text("日本語のファイル");
        assert_eq!(c.cursor_col(), 16);
        let (shown, col) = c.visible(6);
        assert_eq!(shown, "イル");
        assert_eq!(col, 4);

        c.move_home();
        let (shown, col) = c.visible(5);
        assert_eq!(shown, "日本");
        assert_eq!(col, 0);
    }
}
