use std::io::Write;

use crossterm::{cursor, queue, style, terminal};

use crate::config::KeyBindings;

/// Key hints for the menu bar, built from the configured bindings.
pub fn menu_items(keys: &KeyBindings) -> Vec<String> {
    vec![
        format!("[{}][{}] scroll", keys.scroll_up, keys.scroll_down),
        format!("[{}] next", keys.next_section),
        format!("[{}][{}] first/last", keys.first_section, keys.last_section),
        format!("[{}] close", keys.close_popup),
        format!("[{}] quit", keys.quit),
        format!("[{}] full", keys.fullscreen),
    ]
}

/// Print the menu bar on row 0, dropping items that would not fit.
pub fn print_menu_bar<W: Write>(out: &mut W, items: &[String], width: u16) -> anyhow::Result<()> {
    queue!(
        out,
        cursor::MoveTo(0, 0),
        terminal::Clear(terminal::ClearType::CurrentLine),
        style::Print(" "),
    )?;
    let mut used = 1usize;
    for (i, item) in items.iter().enumerate() {
        let gap = if i > 0 { 2 } else { 0 };
        let len = item.chars().count();
        if used + gap + len > usize::from(width) {
            break;
        }
        if gap > 0 {
            queue!(out, style::Print("  "))?;
        }
        print_menu_item(out, item)?;
        used += gap + len;
    }
    Ok(())
}

/// Print a menu item string, bolding any text inside `[...]` brackets.
/// Text outside brackets is printed dim.
pub fn print_menu_item<W: Write>(out: &mut W, item: &str) -> anyhow::Result<()> {
    let mut rest = item;
    while let Some(open) = rest.find('[') {
        if open > 0 {
            print_dim(out, &rest[..open])?;
        }
        rest = &rest[open..];
        let Some(close) = rest.find(']') else {
            queue!(out, style::Print(rest))?;
            return Ok(());
        };
        queue!(
            out,
            style::SetAttribute(style::Attribute::Bold),
            style::Print(&rest[..=close]),
            style::SetAttribute(style::Attribute::Reset),
        )?;
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        print_dim(out, rest)?;
    }
    Ok(())
}

fn print_dim<W: Write>(out: &mut W, text: &str) -> anyhow::Result<()> {
    queue!(
        out,
        style::SetAttribute(style::Attribute::Dim),
        style::Print(text),
        style::SetAttribute(style::Attribute::Reset),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_follow_bindings() {
        let mut keys = KeyBindings::default();
        keys.quit = "x".into();
        let items = menu_items(&keys);
        assert_eq!(items[0], "[Up][Down] scroll");
        assert!(items.contains(&"[x] quit".to_string()));
    }

    #[test]
    fn brackets_print_bold_and_text_dim() {
        let mut out = Vec::new();
        print_menu_item(&mut out, "[q] quit").unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("[q]"));
        assert!(printed.contains(" quit"));
    }

    #[test]
    fn narrow_bars_drop_trailing_items() {
        let items = vec!["[a] one".to_string(), "[b] two".to_string()];
        let mut out = Vec::new();
        print_menu_bar(&mut out, &items, 10).unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("[a]"));
        assert!(!printed.contains("[b]"));
    }
}
