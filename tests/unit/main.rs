//! Unit tests mirroring the `src` module tree

mod algorithm;
mod io;
mod spatial;
