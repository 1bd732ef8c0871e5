pub mod circleci;

pub use circleci::CircleCiProvider;
