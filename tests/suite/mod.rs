//! End-to-end suites against a scripted stand-in for ghc-mod.

#[cfg(unix)]
mod batch;
#[cfg(unix)]
mod interactive;
#[cfg(unix)]
mod lifecycle;
