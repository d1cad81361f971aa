//! Global start/stop hotkey, backed by `rdev`.
//!
//! `rdev::listen()` blocks forever, so it runs on a **dedicated OS thread**
//! owned by [`HotkeyListener`].  Key presses arrive on a tokio mpsc channel as
//! [`HotkeyEvent`]s; the UI turns them into start/stop commands according to
//! the current monitor phase.
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use breath_coach::hotkey::{parse_key, HotkeyListener};
//!
//! let (tx, _rx) = mpsc::channel(16);
//! let key = parse_key("F9").unwrap_or(rdev::Key::F9);
//! let _listener = HotkeyListener::start(key, tx).expect("hotkey thread");
//! ```

pub mod listener;

pub use listener::HotkeyListener;

/// Events emitted by the hotkey listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The toggle key went down (auto-repeat is filtered out).
    ToggleMonitoring,
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

const FUNCTION_KEYS: [rdev::Key; 12] = [
    rdev::Key::F1,
    rdev::Key::F2,
    rdev::Key::F3,
    rdev::Key::F4,
    rdev::Key::F5,
    rdev::Key::F6,
    rdev::Key::F7,
    rdev::Key::F8,
    rdev::Key::F9,
    rdev::Key::F10,
    rdev::Key::F11,
    rdev::Key::F12,
];

const LETTER_KEYS: [rdev::Key; 26] = [
    rdev::Key::KeyA,
    rdev::Key::KeyB,
    rdev::Key::KeyC,
    rdev::Key::KeyD,
    rdev::Key::KeyE,
    rdev::Key::KeyF,
    rdev::Key::KeyG,
    rdev::Key::KeyH,
    rdev::Key::KeyI,
    rdev::Key::KeyJ,
    rdev::Key::KeyK,
    rdev::Key::KeyL,
    rdev::Key::KeyM,
    rdev::Key::KeyN,
    rdev::Key::KeyO,
    rdev::Key::KeyP,
    rdev::Key::KeyQ,
    rdev::Key::KeyR,
    rdev::Key::KeyS,
    rdev::Key::KeyT,
    rdev::Key::KeyU,
    rdev::Key::KeyV,
    rdev::Key::KeyW,
    rdev::Key::KeyX,
    rdev::Key::KeyY,
    rdev::Key::KeyZ,
];

/// Parse the configured toggle key name into an [`rdev::Key`].
///
/// Accepts `F1`–`F12`, a handful of named keys, and single letters, all
/// case-insensitive.  Returns `None` for anything else so the caller can fall
/// back to the default.
///
/// ```
/// use breath_coach::hotkey::parse_key;
///
/// assert_eq!(parse_key("F9"), Some(rdev::Key::F9));
/// assert_eq!(parse_key("pause"), Some(rdev::Key::Pause));
/// assert_eq!(parse_key("b"), Some(rdev::Key::KeyB));
/// assert_eq!(parse_key("F13"), None);
/// ```
pub fn parse_key(name: &str) -> Option<rdev::Key> {
    let name = name.trim().to_ascii_lowercase();

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        return n.checked_sub(1).and_then(|i| FUNCTION_KEYS.get(i)).copied();
    }

    if let [c @ b'a'..=b'z'] = name.as_bytes() {
        return Some(LETTER_KEYS[usize::from(c - b'a')]);
    }

    let key = match name.as_str() {
        "space" => rdev::Key::Space,
        "pause" => rdev::Key::Pause,
        "scrolllock" => rdev::Key::ScrollLock,
        "printscreen" => rdev::Key::PrintScreen,
        "insert" | "ins" => rdev::Key::Insert,
        "home" => rdev::Key::Home,
        "end" => rdev::Key::End,
        "pageup" => rdev::Key::PageUp,
        "pagedown" => rdev::Key::PageDown,
        _ => return None,
    };
    Some(key)
}
