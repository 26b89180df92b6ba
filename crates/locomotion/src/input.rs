use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

/// Physical key identifiers (DOM `KeyboardEvent.code` names).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyCode {
    KeyW,
    KeyA,
    KeyS,
    KeyD,
    KeyQ,
    KeyE,
    KeyC,
    Space,
    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InputEvent {
    KeyDown { key: KeyCode },
    KeyUp { key: KeyCode },
    MouseMove { dx: f64, dy: f64 },
    MouseDown,
    MouseUp,
    PointerLockChanged { locked: bool },
    /// Window lost focus.
    Blur,
    /// Document became hidden.
    VisibilityHidden,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputState {
    held: BTreeSet<KeyCode>,
    /// Key-down edges not yet consumed by a physics step.
    pressed: BTreeSet<KeyCode>,
    mouse_dx: f64,
    mouse_dy: f64,
    pointer_locked: bool,
    mouse_down: bool,
    lock_requested: bool,
}

impl InputState {
    pub fn apply(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyDown { key } => {
                if self.held.insert(key) {
                    self.pressed.insert(key);
                }
            }
            InputEvent::KeyUp { key } => {
                self.held.remove(&key);
            }
            InputEvent::MouseMove { dx, dy } => {
                let (sx, sy) = (self.mouse_dx + dx, self.mouse_dy + dy);
                if sx.is_finite() && sy.is_finite() {
                    self.mouse_dx = sx;
                    self.mouse_dy = sy;
                }
            }
            InputEvent::MouseDown => {
                self.mouse_down = true;
                if !self.pointer_locked {
                    self.lock_requested = true;
                }
            }
            InputEvent::MouseUp => {
                self.mouse_down = false;
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = locked;
                // Whatever moved during the transition is not a look gesture.
                self.mouse_dx = 0.0;
                self.mouse_dy = 0.0;
            }
            InputEvent::Blur | InputEvent::VisibilityHidden => {
                let locked = self.pointer_locked;
                self.clear();
                self.pointer_locked = locked;
            }
        }
    }

    pub fn is_down(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn any_down(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|k| self.held.contains(k))
    }

    /// `1.0`, `-1.0` or `0.0` from two opposing key groups.
    pub fn axis(&self, positive: &[KeyCode], negative: &[KeyCode]) -> f64 {
        let p = if self.any_down(positive) { 1.0 } else { 0.0 };
        let n = if self.any_down(negative) { 1.0 } else { 0.0 };
        p - n
    }

    pub fn was_pressed(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|k| self.pressed.contains(k))
    }

    pub fn clear_pressed(&mut self) {
        self.pressed.clear();
    }

    pub fn held_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.held.iter().copied()
    }

    pub fn mouse_delta(&self) -> (f64, f64) {
        (self.mouse_dx, self.mouse_dy)
    }

    /// Returns and resets the accumulated mouse movement.
    pub fn take_mouse_delta(&mut self) -> (f64, f64) {
        let d = (self.mouse_dx, self.mouse_dy);
        self.mouse_dx = 0.0;
        self.mouse_dy = 0.0;
        d
    }

    pub fn pointer_locked(&self) -> bool {
        self.pointer_locked
    }

    pub fn mouse_down(&self) -> bool {
        self.mouse_down
    }

    /// Mouse movement steers the camera while locked or dragging.
    pub fn look_active(&self) -> bool {
        self.pointer_locked || self.mouse_down
    }

    pub fn take_lock_request(&mut self) -> bool {
        std::mem::take(&mut self.lock_requested)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Default)]
struct HubInner {
    next_id: u64,
    listeners: Vec<(ListenerId, Weak<RefCell<InputState>>)>,
}

/// Shared input scope the host dispatches into.
///
/// Cloning yields another handle to the same scope.
#[derive(Debug, Clone, Default)]
pub struct InputHub {
    inner: Rc<RefCell<HubInner>>,
}

impl InputHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every live listener, in registration order.
    /// Returns how many listeners received it.
    pub fn dispatch(&self, event: &InputEvent) -> usize {
        let mut inner = self.inner.borrow_mut();
        inner.listeners.retain(|(_, w)| w.strong_count() > 0);
        let mut delivered = 0;
        for (_, listener) in &inner.listeners {
            if let Some(state) = listener.upgrade() {
                state.borrow_mut().apply(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|(_, w)| w.strong_count() > 0)
            .count()
    }

    fn register(&self, state: &Rc<RefCell<InputState>>) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Rc::downgrade(state)));
        id
    }

    fn unregister(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(lid, _)| *lid != id);
        inner.listeners.len() != before
    }
}

/// A controller's connection to the [`InputHub`].
#[derive(Debug)]
pub struct InputAdapter {
    hub: InputHub,
    state: Rc<RefCell<InputState>>,
    listener: Option<ListenerId>,
}

impl InputAdapter {
    pub fn new(hub: InputHub) -> Self {
        Self {
            hub,
            state: Rc::new(RefCell::new(InputState::default())),
            listener: None,
        }
    }

    /// Register on the hub. Returns `false` if already attached.
    pub fn attach(&mut self) -> bool {
        if self.listener.is_some() {
            return false;
        }
        self.state.borrow_mut().clear();
        self.listener = Some(self.hub.register(&self.state));
        true
    }

    /// Remove the listener and drop all captured input. Idempotent.
    pub fn detach(&mut self) -> bool {
        let Some(id) = self.listener.take() else {
            return false;
        };
        self.hub.unregister(id);
        self.state.borrow_mut().clear();
        true
    }

    pub fn state(&self) -> Ref<'_, InputState> {
        self.state.borrow()
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut InputState) -> T) -> T {
        f(&mut self.state.borrow_mut())
    }
}

impl Drop for InputAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}
