//! Parallel iteration over independent jobs.
//!
//! With the `parallel` feature this is rayon's prelude. Without it,
//! `into_par_iter()` falls back to `into_iter()` so per-label work such as
//! polygonization runs sequentially through the same call sites.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// `into_par_iter()` for builds without rayon
    pub trait IntoParallelIterator {
        type Iter: Iterator<Item = Self::Item>;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;

        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
