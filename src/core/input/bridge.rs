use super::keys::{KeyCode, MODIFIER_KEYS, VALID_INPUT_KEYS};
use log::trace;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Read access to the external input state during a tick
pub trait InputView {
    /// Whether the key is currently active
    fn is_active(&self, key: KeyCode) -> bool;

    /// Whether any key or scroll input is active
    fn has_any_input(&self) -> bool;
}

/// Raw device state, sampled once per polling cycle
pub trait RawInputSource {
    fn is_key_held(&self, key: KeyCode) -> bool;

    /// Fast check before sampling individual keys
    fn any_key_held(&self) -> bool;

    /// Wheel motion this cycle; negative is downward
    fn scroll_delta(&self) -> f32;
}

/// Immutable record of the inputs active during one polling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    active: HashSet<KeyCode>,
    has_any_input: bool,
}

impl InputSnapshot {
    /// Snapshot with nothing active
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot with exactly these keys active
    pub fn from_keys(keys: impl IntoIterator<Item = KeyCode>) -> Self {
        let active: HashSet<KeyCode> = keys.into_iter().filter(|k| *k != KeyCode::NONE).collect();
        let has_any_input = !active.is_empty();
        Self {
            active,
            has_any_input,
        }
    }

    /// Sample a raw input source.
    ///
    /// Only bindable physical keys are recorded; wheel motion becomes one of the
    /// two synthetic scroll keys. With `suppress_while_modifier_held`, a held
    /// modifier empties the snapshot so editor shortcuts never reach key sensors.
    pub fn sample(source: &dyn RawInputSource, suppress_while_modifier_held: bool) -> Self {
        let scroll = source.scroll_delta();
        if !source.any_key_held() && scroll == 0.0 {
            return Self::empty();
        }

        if suppress_while_modifier_held && MODIFIER_KEYS.iter().any(|k| source.is_key_held(*k)) {
            return Self::empty();
        }

        let mut keys: Vec<KeyCode> = VALID_INPUT_KEYS
            .iter()
            .copied()
            .filter(|k| source.is_key_held(*k))
            .collect();

        if scroll < 0.0 {
            keys.push(KeyCode::SCROLL_DOWN);
        } else if scroll > 0.0 {
            keys.push(KeyCode::SCROLL_UP);
        }

        Self::from_keys(keys)
    }

    pub fn active_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.active.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl InputView for InputSnapshot {
    fn is_active(&self, key: KeyCode) -> bool {
        self.has_any_input && self.active.contains(&key)
    }

    fn has_any_input(&self) -> bool {
        self.has_any_input
    }
}

/// Configuration for the input bridge
#[derive(Debug, Clone)]
pub struct InputBridgeConfig {
    /// Empty the snapshot while control, shift or alt is held
    pub suppress_while_modifier_held: bool,
}

impl InputBridgeConfig {
    pub fn new() -> Self {
        Self {
            suppress_while_modifier_held: true,
        }
    }

    pub fn with_modifier_suppression(mut self, enabled: bool) -> Self {
        self.suppress_while_modifier_held = enabled;
        self
    }
}

impl Default for InputBridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand-off point for live key state between the polling thread and the
/// simulation thread.
///
/// The polling thread calls [`refresh`](Self::refresh) once per cycle; the
/// simulation thread reads through [`InputView`] as often as it likes. The lock
/// is held only for the swap on the write side and a single lookup on the read
/// side, never across a tick.
pub struct ExternalInputBridge {
    snapshot: Mutex<InputSnapshot>,
    suppress_while_modifier_held: AtomicBool,
    refresh_count: AtomicU64,
}

impl ExternalInputBridge {
    pub fn new(config: InputBridgeConfig) -> Self {
        Self {
            snapshot: Mutex::new(InputSnapshot::empty()),
            suppress_while_modifier_held: AtomicBool::new(config.suppress_while_modifier_held),
            refresh_count: AtomicU64::new(0),
        }
    }

    /// Sample the source and swap the new snapshot in
    pub fn refresh(&self, source: &dyn RawInputSource) {
        let snapshot = InputSnapshot::sample(source, self.suppress_while_modifier_held());
        self.publish(snapshot);
    }

    /// Swap in a snapshot built elsewhere
    pub fn publish(&self, snapshot: InputSnapshot) {
        trace!("publishing input snapshot with {} active keys", snapshot.len());
        let previous = {
            let mut guard = self.lock();
            std::mem::replace(&mut *guard, snapshot)
        };
        // Old snapshot is freed outside the lock
        drop(previous);
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> InputSnapshot {
        self.lock().clone()
    }

    pub fn suppress_while_modifier_held(&self) -> bool {
        self.suppress_while_modifier_held.load(Ordering::Relaxed)
    }

    /// Toggle the modifier policy; takes effect at the next refresh
    pub fn set_suppress_while_modifier_held(&self, enabled: bool) {
        self.suppress_while_modifier_held.store(enabled, Ordering::Relaxed);
    }

    /// Number of snapshots published so far
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, InputSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ExternalInputBridge {
    fn default() -> Self {
        Self::new(InputBridgeConfig::default())
    }
}

impl InputView for ExternalInputBridge {
    fn is_active(&self, key: KeyCode) -> bool {
        self.lock().is_active(key)
    }

    fn has_any_input(&self) -> bool {
        self.lock().has_any_input()
    }
}

/// Raw input source backed by a set of held keys, for hosts that track key
/// state from their own event loop
#[derive(Debug, Clone, Default)]
pub struct HeldKeys {
    held: HashSet<KeyCode>,
    scroll: f32,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: KeyCode) -> Self {
        self.press(key);
        self
    }

    pub fn with_scroll(mut self, delta: f32) -> Self {
        self.scroll = delta;
        self
    }

    pub fn press(&mut self, key: KeyCode) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    pub fn set_scroll(&mut self, delta: f32) {
        self.scroll = delta;
    }
}

impl RawInputSource for HeldKeys {
    fn is_key_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    fn any_key_held(&self) -> bool {
        !self.held.is_empty()
    }

    fn scroll_delta(&self) -> f32 {
        self.scroll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_refresh_with_nothing_held() {
        let bridge = ExternalInputBridge::default();
        bridge.refresh(&HeldKeys::new());
        assert!(!bridge.has_any_input());
        assert!(!bridge.is_active(KeyCode::A));
        assert_eq!(bridge.refresh_count(), 1);
    }

    #[test]
    fn test_refresh_records_held_keys() {
        let bridge = ExternalInputBridge::default();
        bridge.refresh(&HeldKeys::new().with_key(KeyCode::A).with_key(KeyCode::SPACE));
        assert!(bridge.has_any_input());
        assert!(bridge.is_active(KeyCode::A));
        assert!(bridge.is_active(KeyCode::SPACE));
        assert!(!bridge.is_active(KeyCode::B));
    }

    #[test]
    fn test_unbindable_keys_are_ignored() {
        let bridge = ExternalInputBridge::default();
        bridge.refresh(&HeldKeys::new().with_key(KeyCode(1)));
        assert!(!bridge.has_any_input());
    }

    #[test]
    fn test_modifier_suppresses_snapshot() {
        let bridge = ExternalInputBridge::default();
        let source = HeldKeys::new().with_key(KeyCode::LEFT_CONTROL).with_key(KeyCode::S);
        bridge.refresh(&source);
        assert!(!bridge.has_any_input());
        assert!(!bridge.is_active(KeyCode::S));

        bridge.set_suppress_while_modifier_held(false);
        bridge.refresh(&source);
        assert!(bridge.has_any_input());
        assert!(bridge.is_active(KeyCode::S));
        assert!(bridge.is_active(KeyCode::LEFT_CONTROL));
    }

    #[test]
    fn test_scroll_maps_to_exclusive_synthetic_keys() {
        let bridge = ExternalInputBridge::default();
        bridge.refresh(&HeldKeys::new().with_scroll(1.5));
        assert!(bridge.has_any_input());
        assert!(bridge.is_active(KeyCode::SCROLL_UP));
        assert!(!bridge.is_active(KeyCode::SCROLL_DOWN));

        bridge.refresh(&HeldKeys::new().with_scroll(-0.1));
        assert!(bridge.is_active(KeyCode::SCROLL_DOWN));
        assert!(!bridge.is_active(KeyCode::SCROLL_UP));
    }

    #[test]
    fn test_snapshot_is_replaced_wholesale() {
        let bridge = ExternalInputBridge::default();
        bridge.refresh(&HeldKeys::new().with_key(KeyCode::A));
        bridge.refresh(&HeldKeys::new().with_key(KeyCode::B));
        let snapshot = bridge.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.is_active(KeyCode::B));
        assert!(!snapshot.is_active(KeyCode::A));
    }

    #[test]
    fn test_concurrent_refresh_and_reads_see_whole_snapshots() {
        let bridge = Arc::new(ExternalInputBridge::default());
        let writer = {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                let held = HeldKeys::new().with_key(KeyCode::A).with_key(KeyCode::B);
                let idle = HeldKeys::new();
                for i in 0..2000 {
                    if i % 2 == 0 {
                        bridge.refresh(&held);
                    } else {
                        bridge.refresh(&idle);
                    }
                }
            })
        };

        for _ in 0..2000 {
            let snapshot = bridge.snapshot();
            assert_eq!(snapshot.has_any_input(), !snapshot.is_empty());
            assert_eq!(snapshot.is_active(KeyCode::A), snapshot.is_active(KeyCode::B));
        }
        writer.join().unwrap();
        assert_eq!(bridge.refresh_count(), 2000);
    }
}
