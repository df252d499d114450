//! Scoped acquisition of transient backend resources.

use std::ops::{Deref, DerefMut};

/// Owns a backend resource for the length of one scope.
///
/// The resource is handed back to `release` when the guard drops, on every
/// exit path, unless [`Scoped::into_inner`] moved it out first.
pub struct Scoped<'a, B, T> {
    backend: &'a B,
    value: Option<T>,
    release: fn(&B, T),
}

impl<'a, B, T> Scoped<'a, B, T> {
    pub fn new(backend: &'a B, value: T, release: fn(&B, T)) -> Self {
        Self {
            backend,
            value: Some(value),
            release,
        }
    }

    /// Keep the resource past this scope.
    pub fn into_inner(mut self) -> T {
        self.value.take().expect("scoped resource already taken")
    }

    /// Give up ownership without releasing.
    ///
    /// Only for resources the GPU may still be using when their fence can no
    /// longer be trusted to signal.
    pub fn leak(mut self) {
        std::mem::forget(self.value.take());
    }
}

impl<B, T> Deref for Scoped<'_, B, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().expect("scoped resource already taken")
    }
}

impl<B, T> DerefMut for Scoped<'_, B, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("scoped resource already taken")
    }
}

impl<B, T> Drop for Scoped<'_, B, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            (self.release)(self.backend, value);
        }
    }
}
