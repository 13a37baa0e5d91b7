//! Key name to X11 keysym mapping and key combination parsing.

pub const SHIFT_L: u32 = 0xffe1;
pub const CONTROL_L: u32 = 0xffe3;
pub const RETURN: u32 = 0xff0d;

/// Parse a key combination such as `"ctrl c"`, `"ctrl+shift+t"` or
/// `"Return"` into keysyms in press order. Keys are released in reverse.
pub fn parse_key_combination(combo: &str) -> Result<Vec<u32>, String> {
    let names: Vec<&str> = combo
        .split(|c: char| c.is_whitespace() || c == '+')
        .filter(|s| !s.is_empty())
        .collect();

    // A lone "+" or " " names the key itself.
    if names.is_empty() {
        return match combo {
            "+" => Ok(vec![char_to_keysym('+')]),
            " " => Ok(vec![char_to_keysym(' ')]),
            _ => Err("empty key string".into()),
        };
    }

    names
        .iter()
        .map(|name| get_keysym(name).ok_or_else(|| format!("unknown key: {name}")))
        .collect()
}

/// Check if a character requires Shift to type on a US keyboard.
pub fn char_needs_shift(c: char) -> bool {
    matches!(c,
        '~' | '!' | '@' | '#' | '$' | '%' | '^' | '&' | '*' | '(' | ')' |
        '_' | '+' | '{' | '}' | '|' | ':' | '"' | '<' | '>' | '?' |
        'A'..='Z'
    )
}

/// Unshifted base character for a shifted character on a US keyboard.
pub fn get_unshifted_char(c: char) -> char {
    match c {
        '~' => '`', '!' => '1', '@' => '2', '#' => '3', '$' => '4',
        '%' => '5', '^' => '6', '&' => '7', '*' => '8', '(' => '9',
        ')' => '0', '_' => '-', '+' => '=', '{' => '[', '}' => ']',
        '|' => '\\', ':' => ';', '"' => '\'', '<' => ',', '>' => '.',
        '?' => '/',
        c if c.is_ascii_uppercase() => c.to_ascii_lowercase(),
        other => other,
    }
}

/// Keysym for a key name (case-insensitive) or a single character.
pub fn get_keysym(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(char_to_keysym(c));
    }

    match name.to_lowercase().as_str() {
        "return" | "enter"     => Some(RETURN),
        "tab"                  => Some(0xff09),
        "backspace" | "back"   => Some(0xff08),
        "delete" | "del"       => Some(0xffff),
        "escape" | "esc"       => Some(0xff1b),
        "space"                => Some(0x0020),
        "home"                 => Some(0xff50),
        "end"                  => Some(0xff57),
        "pageup" | "page_up" | "pgup"       => Some(0xff55),
        "pagedown" | "page_down" | "pgdn"   => Some(0xff56),
        "insert"               => Some(0xff63),
        "up" | "arrowup"       => Some(0xff52),
        "down" | "arrowdown"   => Some(0xff54),
        "left" | "arrowleft"   => Some(0xff51),
        "right" | "arrowright" => Some(0xff53),
        "f1"  => Some(0xffbe), "f2"  => Some(0xffbf),
        "f3"  => Some(0xffc0), "f4"  => Some(0xffc1),
        "f5"  => Some(0xffc2), "f6"  => Some(0xffc3),
        "f7"  => Some(0xffc4), "f8"  => Some(0xffc5),
        "f9"  => Some(0xffc6), "f10" => Some(0xffc7),
        "f11" => Some(0xffc8), "f12" => Some(0xffc9),
        "ctrl" | "control" | "ctrlleft"     => Some(CONTROL_L),
        "ctrlright"                         => Some(0xffe4),
        "shift" | "shiftleft"               => Some(SHIFT_L),
        "shiftright"                        => Some(0xffe2),
        "alt" | "altleft" | "option"        => Some(0xffe9),
        "altright"                          => Some(0xffea),
        "super" | "meta" | "cmd" | "command" | "win" | "winleft" => Some(0xffeb),
        "capslock" | "caps_lock" => Some(0xffe5),
        "numlock" | "num_lock"   => Some(0xff7f),
        "scrolllock" | "scroll_lock" => Some(0xff14),
        "print" | "printscreen" | "prtsc" => Some(0xff61),
        "pause"                  => Some(0xff13),
        "menu" | "apps"          => Some(0xff67),
        _ => None,
    }
}

/// Convert a single character to its X11 keysym.
pub fn char_to_keysym(c: char) -> u32 {
    match c {
        // Printable ASCII maps directly
        ' '..='~' => c as u32,
        '\n' => RETURN,
        '\t' => 0xff09,
        _ => 0x0100_0000 | (c as u32),
    }
}
