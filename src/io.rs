// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! The input port: how key edges and quit requests reach the interpreter.
//!
//! The interpreter never talks to a window system. A host hands it something
//! that implements [KeyInput], and the only place the core ever *waits* on that
//! input is the `Fx0A` key-wait instruction.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

/// A single keypad edge: hex key code, and whether it went down
pub type KeyEdge = (u8, bool);

/// A source of hex-keypad edges and quit requests
pub trait KeyInput {
    /// Returns every key edge observed since the last poll, oldest first.
    ///
    /// Mapping physical keys onto the 16 hex codes is the implementor's job.
    fn poll_key_edges(&mut self) -> Vec<KeyEdge>;
    /// Returns true once the host wants the interpreter to stop
    fn quit_requested(&self) -> bool;
}

impl<T: KeyInput + ?Sized> KeyInput for &mut T {
    fn poll_key_edges(&mut self) -> Vec<KeyEdge> {
        (**self).poll_key_edges()
    }
    fn quit_requested(&self) -> bool {
        (**self).quit_requested()
    }
}

/// A cloneable, thread-safe quit flag.
///
/// # Examples
/// ```rust
/// # use chip8vm::*;
/// let quit = QuitSignal::default();
/// let other = quit.clone();
/// assert!(!other.is_set());
/// quit.set();
/// assert!(other.is_set());
/// ```
#[derive(Clone, Debug, Default)]
pub struct QuitSignal(Arc<AtomicBool>);

impl QuitSignal {
    /// Raises the flag
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed)
    }
    /// Lowers the flag
    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed)
    }
    /// Reads the flag
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A scripted queue of key edges, handed out one edge per poll.
///
/// Once drained it reports a quit request, so a key-wait can never spin forever
/// on a script that ran out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyQueue {
    edges: VecDeque<KeyEdge>,
    polls: usize,
}

impl KeyQueue {
    /// Builds a queue from a list of edges
    pub fn new(edges: impl IntoIterator<Item = KeyEdge>) -> Self {
        KeyQueue {
            edges: edges.into_iter().collect(),
            polls: 0,
        }
    }
    /// Appends an edge to the end of the script
    pub fn push(&mut self, code: u8, pressed: bool) -> &mut Self {
        self.edges.push_back((code, pressed));
        self
    }
    /// Number of edges left in the script
    pub fn len(&self) -> usize {
        self.edges.len()
    }
    /// Returns true if the script has run out
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
    /// Number of times the queue has been polled
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl KeyInput for KeyQueue {
    fn poll_key_edges(&mut self) -> Vec<KeyEdge> {
        self.polls += 1;
        self.edges.pop_front().into_iter().collect()
    }
    fn quit_requested(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Input that never produces edges and never asks to quit.
///
/// Fine for programs that don't wait on keys; a key-wait under [NoInput] only
/// ends through [crate::CPU::request_quit] from another thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoInput;

impl KeyInput for NoInput {
    fn poll_key_edges(&mut self) -> Vec<KeyEdge> {
        std::thread::yield_now();
        vec![]
    }
    fn quit_requested(&self) -> bool {
        false
    }
}

impl PartialEq for QuitSignal {
    fn eq(&self, other: &Self) -> bool {
        self.is_set() == other.is_set()
    }
}

/// Key edges and a quit flag shared between an input thread and the interpreter.
///
/// # Examples
/// ```rust
/// # use chip8vm::*;
/// let mut keys = SharedKeys::default();
/// let producer = keys.clone();
/// std::thread::spawn(move || producer.send(0xa, true))
///     .join()
///     .unwrap();
/// assert_eq!(vec![(0xa, true)], keys.poll_key_edges());
/// assert!(keys.poll_key_edges().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SharedKeys {
    edges: Arc<Mutex<VecDeque<KeyEdge>>>,
    quit: QuitSignal,
}

impl SharedKeys {
    /// Reports a key edge from the input side
    pub fn send(&self, code: u8, pressed: bool) {
        self.edges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((code, pressed));
    }
    /// Gets the quit flag, for the input side to raise
    pub fn quit_signal(&self) -> QuitSignal {
        self.quit.clone()
    }
}

impl KeyInput for SharedKeys {
    fn poll_key_edges(&mut self) -> Vec<KeyEdge> {
        let edges: Vec<_> = self
            .edges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if edges.is_empty() {
            std::thread::yield_now();
        }
        edges
    }
    fn quit_requested(&self) -> bool {
        self.quit.is_set()
    }
}
