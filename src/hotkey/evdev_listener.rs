//! evdev-based chord listener
//!
//! Opens every keyboard device under /dev/input in non-blocking mode and
//! tracks held keys. A binding fires on the press transition of its
//! non-modifier key while all its modifiers are held; key repeats are
//! ignored. Events are delivered with a blocking send on a bounded channel.

use super::HotkeyListener;
use crate::config::HotkeyBinding;
use crate::error::HotkeyError;
use crate::mode::CorrectionMode;
use evdev::{Device, InputEventKind, Key};
use std::collections::HashSet;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// One compiled chord: modifiers that must be held plus the trigger key
#[derive(Debug, Clone)]
struct CompiledBinding {
    mode: CorrectionMode,
    modifiers: HashSet<Key>,
    key: Key,
}

/// evdev-based hotkey dispatcher
pub struct EvdevListener {
    bindings: Vec<CompiledBinding>,
    device_paths: Vec<PathBuf>,
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevListener {
    /// Compile the binding set and locate keyboard devices
    pub fn new(bindings: &[HotkeyBinding]) -> Result<Self, HotkeyError> {
        let compiled = bindings
            .iter()
            .map(|b| parse_chord(b.mode, &b.chord))
            .collect::<Result<Vec<_>, _>>()?;

        let device_paths = find_keyboard_devices()?;

        if device_paths.is_empty() {
            return Err(HotkeyError::NoKeyboard);
        }

        tracing::debug!(
            "Found {} keyboard device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        Ok(Self {
            bindings: compiled,
            device_paths,
            stop_signal: None,
        })
    }
}

#[async_trait::async_trait]
impl HotkeyListener for EvdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<CorrectionMode>, HotkeyError> {
        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let bindings = self.bindings.clone();
        let device_paths = self.device_paths.clone();

        tokio::task::spawn_blocking(move || {
            listener_loop(device_paths, bindings, tx, stop_rx);
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), HotkeyError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// Main listener loop running in a blocking task
fn listener_loop(
    device_paths: Vec<PathBuf>,
    bindings: Vec<CompiledBinding>,
    tx: mpsc::Sender<CorrectionMode>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // Open all keyboard devices in non-blocking mode
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No keyboard devices could be opened");
        return;
    }

    // All keys currently held, across every device
    let mut held: HashSet<Key> = HashSet::new();

    tracing::info!("Listening for {} chord(s)", bindings.len());

    loop {
        // Check for stop signal (non-blocking)
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Hotkey listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        for device in &mut devices {
            // fetch_events returns immediately if no events (non-blocking)
            if let Ok(events) = device.fetch_events() {
                for event in events {
                    if let InputEventKind::Key(key) = event.kind() {
                        match event.value() {
                            1 => {
                                held.insert(key);
                                if let Some(binding) = matched_binding(&bindings, key, &held) {
                                    tracing::debug!("Chord matched: {}", binding.mode);
                                    if tx.blocking_send(binding.mode).is_err() {
                                        return; // channel closed
                                    }
                                }
                            }
                            0 => {
                                held.remove(&key);
                            }
                            // 2 = key repeat, ignored: a held chord fires once
                            _ => {}
                        }
                    }
                }
            }
        }

        // Small sleep to avoid busy-waiting
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// Resolve a key press against the binding set. Among bindings whose
/// trigger is `key` and whose modifiers are all held, the one with the
/// largest modifier set wins, so `leftctrl+leftshift+g` beats `leftctrl+g`
/// when Shift is also down. Ties keep declaration order.
fn matched_binding<'a>(
    bindings: &'a [CompiledBinding],
    key: Key,
    held: &HashSet<Key>,
) -> Option<&'a CompiledBinding> {
    bindings
        .iter()
        .filter(|b| b.key == key && b.modifiers.iter().all(|m| held.contains(m)))
        .fold(None, |best: Option<&CompiledBinding>, b| match best {
            Some(best) if best.modifiers.len() >= b.modifiers.len() => Some(best),
            _ => Some(b),
        })
}

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, HotkeyError> {
    let mut keyboards = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| HotkeyError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                // A keyboard should have at least some letter keys
                let has_keys = device
                    .supported_keys()
                    .map(|keys| {
                        keys.contains(Key::KEY_A)
                            && keys.contains(Key::KEY_Z)
                            && keys.contains(Key::KEY_ENTER)
                    })
                    .unwrap_or(false);

                if has_keys {
                    tracing::debug!(
                        "Found keyboard: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    keyboards.push(path);
                }
            }
            Err(e) => {
                // Permission denied is common for non-input-group users
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(HotkeyError::DeviceAccess(path.display().to_string()));
                }
                // Other errors (device busy, etc.) - just skip
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(keyboards)
}

/// Parse a chord string like "leftctrl+leftshift+g". The last token is the
/// trigger key; everything before it is a modifier.
fn parse_chord(mode: CorrectionMode, chord: &str) -> Result<CompiledBinding, HotkeyError> {
    let tokens: Vec<&str> = chord.split('+').filter(|t| !t.is_empty()).collect();

    let (&key_name, modifier_names) = tokens
        .split_last()
        .ok_or_else(|| HotkeyError::EmptyChord(chord.to_string()))?;

    let key = parse_key_name(key_name)?;
    if is_modifier(key) {
        return Err(HotkeyError::EmptyChord(chord.to_string()));
    }

    let modifiers = modifier_names
        .iter()
        .map(|name| parse_key_name(name))
        .collect::<Result<HashSet<_>, _>>()?;

    Ok(CompiledBinding {
        mode,
        modifiers,
        key,
    })
}

fn is_modifier(key: Key) -> bool {
    matches!(
        key,
        Key::KEY_LEFTCTRL
            | Key::KEY_RIGHTCTRL
            | Key::KEY_LEFTALT
            | Key::KEY_RIGHTALT
            | Key::KEY_LEFTSHIFT
            | Key::KEY_RIGHTSHIFT
            | Key::KEY_LEFTMETA
            | Key::KEY_RIGHTMETA
    )
}

/// Parse a key name string to evdev Key
fn parse_key_name(name: &str) -> Result<Key, HotkeyError> {
    // Normalize: uppercase and replace - or space with _
    let normalized: String = name
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    // Add KEY_ prefix if not present
    let key_name = if normalized.starts_with("KEY_") {
        normalized
    } else {
        format!("KEY_{}", normalized)
    };

    let key = match key_name.as_str() {
        // Letters
        "KEY_A" => Key::KEY_A,
        "KEY_B" => Key::KEY_B,
        "KEY_C" => Key::KEY_C,
        "KEY_D" => Key::KEY_D,
        "KEY_E" => Key::KEY_E,
        "KEY_F" => Key::KEY_F,
        "KEY_G" => Key::KEY_G,
        "KEY_H" => Key::KEY_H,
        "KEY_I" => Key::KEY_I,
        "KEY_J" => Key::KEY_J,
        "KEY_K" => Key::KEY_K,
        "KEY_L" => Key::KEY_L,
        "KEY_M" => Key::KEY_M,
        "KEY_N" => Key::KEY_N,
        "KEY_O" => Key::KEY_O,
        "KEY_P" => Key::KEY_P,
        "KEY_Q" => Key::KEY_Q,
        "KEY_R" => Key::KEY_R,
        "KEY_S" => Key::KEY_S,
        "KEY_T" => Key::KEY_T,
        "KEY_U" => Key::KEY_U,
        "KEY_V" => Key::KEY_V,
        "KEY_W" => Key::KEY_W,
        "KEY_X" => Key::KEY_X,
        "KEY_Y" => Key::KEY_Y,
        "KEY_Z" => Key::KEY_Z,

        // Digits (top row)
        "KEY_0" => Key::KEY_0,
        "KEY_1" => Key::KEY_1,
        "KEY_2" => Key::KEY_2,
        "KEY_3" => Key::KEY_3,
        "KEY_4" => Key::KEY_4,
        "KEY_5" => Key::KEY_5,
        "KEY_6" => Key::KEY_6,
        "KEY_7" => Key::KEY_7,
        "KEY_8" => Key::KEY_8,
        "KEY_9" => Key::KEY_9,

        // Modifier keys
        "KEY_LEFTALT" | "KEY_LALT" | "KEY_ALT" | "KEY_OPTION" => Key::KEY_LEFTALT,
        "KEY_RIGHTALT" | "KEY_RALT" => Key::KEY_RIGHTALT,
        "KEY_LEFTCTRL" | "KEY_LCTRL" | "KEY_CTRL" => Key::KEY_LEFTCTRL,
        "KEY_RIGHTCTRL" | "KEY_RCTRL" => Key::KEY_RIGHTCTRL,
        "KEY_LEFTSHIFT" | "KEY_LSHIFT" | "KEY_SHIFT" => Key::KEY_LEFTSHIFT,
        "KEY_RIGHTSHIFT" | "KEY_RSHIFT" => Key::KEY_RIGHTSHIFT,
        "KEY_LEFTMETA" | "KEY_LMETA" | "KEY_SUPER" | "KEY_CMD" => Key::KEY_LEFTMETA,
        "KEY_RIGHTMETA" | "KEY_RMETA" => Key::KEY_RIGHTMETA,

        // Function keys (F13-F24 are often unused and make good hotkeys)
        "KEY_F1" => Key::KEY_F1,
        "KEY_F2" => Key::KEY_F2,
        "KEY_F3" => Key::KEY_F3,
        "KEY_F4" => Key::KEY_F4,
        "KEY_F5" => Key::KEY_F5,
        "KEY_F6" => Key::KEY_F6,
        "KEY_F7" => Key::KEY_F7,
        "KEY_F8" => Key::KEY_F8,
        "KEY_F9" => Key::KEY_F9,
        "KEY_F10" => Key::KEY_F10,
        "KEY_F11" => Key::KEY_F11,
        "KEY_F12" => Key::KEY_F12,
        "KEY_F13" => Key::KEY_F13,
        "KEY_F14" => Key::KEY_F14,
        "KEY_F15" => Key::KEY_F15,
        "KEY_F16" => Key::KEY_F16,
        "KEY_F17" => Key::KEY_F17,
        "KEY_F18" => Key::KEY_F18,
        "KEY_F19" => Key::KEY_F19,
        "KEY_F20" => Key::KEY_F20,
        "KEY_F21" => Key::KEY_F21,
        "KEY_F22" => Key::KEY_F22,
        "KEY_F23" => Key::KEY_F23,
        "KEY_F24" => Key::KEY_F24,

        // Lock and navigation keys
        "KEY_SCROLLLOCK" => Key::KEY_SCROLLLOCK,
        "KEY_PAUSE" => Key::KEY_PAUSE,
        "KEY_INSERT" => Key::KEY_INSERT,
        "KEY_HOME" => Key::KEY_HOME,
        "KEY_END" => Key::KEY_END,
        "KEY_PAGEUP" => Key::KEY_PAGEUP,
        "KEY_PAGEDOWN" => Key::KEY_PAGEDOWN,
        "KEY_DELETE" => Key::KEY_DELETE,

        // Common keys
        "KEY_SPACE" => Key::KEY_SPACE,
        "KEY_ENTER" => Key::KEY_ENTER,
        "KEY_TAB" => Key::KEY_TAB,
        "KEY_BACKSPACE" => Key::KEY_BACKSPACE,
        "KEY_ESC" | "KEY_ESCAPE" => Key::KEY_ESC,
        "KEY_GRAVE" | "KEY_BACKTICK" => Key::KEY_GRAVE,

        _ => {
            return Err(HotkeyError::UnknownKey(format!(
                "{}. Try letters, digits, F1-F24, or run 'evtest' to find key names",
                name
            )));
        }
    };

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_name() {
        assert_eq!(parse_key_name("g").unwrap(), Key::KEY_G);
        assert_eq!(parse_key_name("LEFTCTRL").unwrap(), Key::KEY_LEFTCTRL);
        assert_eq!(parse_key_name("LeftShift").unwrap(), Key::KEY_LEFTSHIFT);
        assert_eq!(parse_key_name("KEY_F13").unwrap(), Key::KEY_F13);
        assert_eq!(parse_key_name("ctrl").unwrap(), Key::KEY_LEFTCTRL);
    }

    #[test]
    fn test_parse_key_name_error() {
        assert!(parse_key_name("NOT_A_KEY").is_err());
    }

    #[test]
    fn test_parse_chord() {
        let binding = parse_chord(CorrectionMode::GrammarFix, "leftctrl+leftshift+g").unwrap();
        assert_eq!(binding.key, Key::KEY_G);
        assert_eq!(binding.modifiers.len(), 2);
        assert!(binding.modifiers.contains(&Key::KEY_LEFTCTRL));
        assert!(binding.modifiers.contains(&Key::KEY_LEFTSHIFT));
    }

    #[test]
    fn test_parse_chord_single_key() {
        let binding = parse_chord(CorrectionMode::Formal, "f13").unwrap();
        assert_eq!(binding.key, Key::KEY_F13);
        assert!(binding.modifiers.is_empty());
    }

    #[test]
    fn test_parse_chord_rejects_modifier_trigger() {
        // A chord must end in a non-modifier key
        assert!(parse_chord(CorrectionMode::Casual, "leftctrl+leftshift").is_err());
    }

    #[test]
    fn test_parse_chord_rejects_empty() {
        assert!(parse_chord(CorrectionMode::Casual, "").is_err());
        assert!(parse_chord(CorrectionMode::Casual, "+").is_err());
    }

    fn held(keys: &[Key]) -> HashSet<Key> {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_most_specific_chord_wins() {
        let bindings = vec![
            parse_chord(CorrectionMode::GrammarFix, "leftctrl+g").unwrap(),
            parse_chord(CorrectionMode::Formal, "leftctrl+leftshift+g").unwrap(),
        ];

        // Ctrl+Shift+G satisfies both chords; the longer one fires.
        let matched = matched_binding(
            &bindings,
            Key::KEY_G,
            &held(&[Key::KEY_LEFTCTRL, Key::KEY_LEFTSHIFT, Key::KEY_G]),
        )
        .unwrap();
        assert_eq!(matched.mode, CorrectionMode::Formal);

        let matched = matched_binding(
            &bindings,
            Key::KEY_G,
            &held(&[Key::KEY_LEFTCTRL, Key::KEY_G]),
        )
        .unwrap();
        assert_eq!(matched.mode, CorrectionMode::GrammarFix);
    }

    #[test]
    fn test_equal_specificity_keeps_declaration_order() {
        let bindings = vec![
            parse_chord(CorrectionMode::Casual, "leftctrl+g").unwrap(),
            parse_chord(CorrectionMode::Expand, "leftshift+g").unwrap(),
        ];
        let matched = matched_binding(
            &bindings,
            Key::KEY_G,
            &held(&[Key::KEY_LEFTCTRL, Key::KEY_LEFTSHIFT, Key::KEY_G]),
        )
        .unwrap();
        assert_eq!(matched.mode, CorrectionMode::Casual);
    }

    #[test]
    fn test_no_match_without_required_modifiers() {
        let bindings = vec![parse_chord(CorrectionMode::GrammarFix, "leftctrl+g").unwrap()];
        assert!(matched_binding(&bindings, Key::KEY_G, &held(&[Key::KEY_G])).is_none());
        assert!(matched_binding(
            &bindings,
            Key::KEY_H,
            &held(&[Key::KEY_LEFTCTRL, Key::KEY_H])
        )
        .is_none());
    }

    #[test]
    fn test_parse_chord_unknown_key() {
        let err = parse_chord(CorrectionMode::Expand, "leftctrl+bogus").unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
