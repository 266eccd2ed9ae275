//! Circular dependency detection infrastructure.
//!
//! The chain of frames under construction is an explicit value passed down
//! every nested resolution. Each frame lives on the stack of the call
//! producing it, so the chain is empty before a top-level resolution starts
//! and after it returns, whatever the outcome.
//!
//! Synthesized factories are called through plain trait methods that carry
//! no context. While a recipe runs, its frame is therefore also recorded in a
//! thread-confined list tagged with the owning locator; a factory call on the
//! same thread resumes that path instead of starting from an empty chain.

use std::cell::RefCell;
use std::fmt;

use crate::error::{DiError, DiResult};
use crate::key::{Key, TypeKey};

const MAX_DEPTH: usize = 1024;

/// What one frame of the chain is producing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    /// A keyed binding.
    Key(Key),
    /// The explicit contributions of a collection of `element`.
    Contributions { element: TypeKey, map: bool },
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Key(key) => write!(f, "{key}"),
            Frame::Contributions { element, map: false } => write!(f, "{element} set contributions"),
            Frame::Contributions { element, map: true } => write!(f, "{element} map contributions"),
        }
    }
}

/// Frames currently being produced on one resolution call tree, innermost
/// frame first.
#[derive(Clone, Copy)]
pub(crate) struct ResolutionChain<'a> {
    parent: Option<&'a ResolutionChain<'a>>,
    frame: Option<&'a Frame>,
    inherited: &'a [Frame],
    depth: usize,
}

impl<'a> ResolutionChain<'a> {
    #[cfg(test)]
    pub(crate) fn root() -> Self {
        Self::resumed(&[])
    }

    /// Chain continuing `inherited`, outermost frame first.
    pub(crate) fn resumed(inherited: &'a [Frame]) -> Self {
        Self {
            parent: None,
            frame: None,
            inherited,
            depth: inherited.len(),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Pushes `frame`, failing if it is already being produced higher up.
    pub(crate) fn enter<'b>(&'b self, frame: &'b Frame) -> DiResult<ResolutionChain<'b>>
    where
        'a: 'b,
    {
        if self.contains(frame) {
            let mut path = self.path();
            path.push(frame.to_string());
            return Err(DiError::Circular { path });
        }
        if self.depth >= MAX_DEPTH {
            return Err(DiError::DepthExceeded(self.depth));
        }
        Ok(ResolutionChain {
            parent: Some(self),
            frame: Some(frame),
            inherited: self.inherited,
            depth: self.depth + 1,
        })
    }

    pub(crate) fn contains(&self, frame: &Frame) -> bool {
        self.frames().any(|f| f == frame) || self.inherited.contains(frame)
    }

    /// Frames from the outermost to the innermost.
    pub(crate) fn path(&self) -> Vec<String> {
        let mut own: Vec<String> = self.frames().map(Frame::to_string).collect();
        own.reverse();
        let mut path: Vec<String> = self.inherited.iter().map(Frame::to_string).collect();
        path.extend(own);
        path
    }

    fn frames(&self) -> impl Iterator<Item = &'a Frame> + '_ {
        let mut cursor = Some(self);
        std::iter::from_fn(move || loop {
            let link = cursor?;
            cursor = link.parent;
            if let Some(frame) = link.frame {
                return Some(frame);
            }
        })
    }
}

thread_local! {
    static ACTIVE: RefCell<Vec<(usize, Frame)>> = const { RefCell::new(Vec::new()) };
}

/// Pops the frame pushed by [`track`], also when the recipe panics.
struct ActiveGuard;

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            active.borrow_mut().pop();
        });
    }
}

/// Runs `produce` with `frame` recorded as active for locator `owner` on the
/// current thread.
pub(crate) fn track<R>(owner: usize, frame: &Frame, produce: impl FnOnce() -> R) -> R {
    ACTIVE.with(|active| active.borrow_mut().push((owner, frame.clone())));
    let _guard = ActiveGuard;
    produce()
}

/// Frames active for locator `owner` on the current thread, outermost first.
pub(crate) fn active_frames(owner: usize) -> Vec<Frame> {
    ACTIVE.with(|active| {
        active
            .borrow()
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, frame)| frame.clone())
            .collect()
    })
}
