//! Named, independently seeded random number streams.
//!
//! Each stream is keyed by a type declared with [`define_rng!`]. A stream's generator is
//! created lazily the first time it is sampled, seeded with the base seed plus a stable
//! hash of the stream's name. Draws from one stream therefore never shift the sequence
//! produced by another, which keeps runs reproducible as components are added.
mod macros;

use std::any::{Any, TypeId};
use std::cell::{RefCell, RefMut};

use log::trace;
pub use macros::define_rng;

use crate::hashing::{hash_str, HashMap};
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::distr::Distribution;
use crate::rand::{Rng, SeedableRng};

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

// This is a wrapper that allows for future support for different types of
// random number generators (anything that implements SeedableRng is valid).
struct RngHolder {
    rng: Box<dyn Any>,
}

/// Stores:
/// * `base_seed`: A base seed for all rngs
/// * `rng_holders`: A map of rngs, keyed by their `RngId`. Note that this is
///   stored in a `RefCell` to allow sampling through a shared reference.
pub struct RandomStreams {
    base_seed: u64,
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

impl RandomStreams {
    #[must_use]
    pub fn new(base_seed: u64) -> RandomStreams {
        trace!("initializing random streams with base seed {base_seed}");
        RandomStreams {
            base_seed,
            rng_holders: RefCell::new(HashMap::default()),
        }
    }

    /// Creates streams from an explicit seed, or from OS entropy when `seed` is `None`.
    #[must_use]
    pub fn from_optional_seed(seed: Option<u64>) -> RandomStreams {
        let base_seed = seed.unwrap_or_else(|| rand::rng().random());
        RandomStreams::new(base_seed)
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Gets a mutable reference to the random number generator associated with the given
    /// [`RngId`]. If the Rng has not been used before, one will be created from the base seed.
    fn get_rng<R: RngId + 'static>(&self) -> RefMut<R::RngType> {
        let rng_holders = self.rng_holders.try_borrow_mut().unwrap();
        RefMut::map(rng_holders, |holders| {
            holders
                .entry(TypeId::of::<R>())
                // Create a new rng holder if it doesn't exist yet
                .or_insert_with(|| {
                    trace!(
                        "creating new RNG (seed={}) for {}",
                        self.base_seed,
                        R::get_name()
                    );
                    let seed_offset = hash_str(R::get_name());
                    RngHolder {
                        rng: Box::new(R::RngType::seed_from_u64(
                            self.base_seed.wrapping_add(seed_offset),
                        )),
                    }
                })
                .rng
                .downcast_mut::<R::RngType>()
                .unwrap()
        })
    }

    /// Gets a random sample from the stream associated with the given [`RngId`] by
    /// applying the specified sampler function.
    pub fn sample<R: RngId + 'static, T>(
        &self,
        _rng_type: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = self.get_rng::<R>();
        sampler(&mut rng)
    }

    /// Gets a random sample from the specified distribution using the stream
    /// associated with the given [`RngId`].
    pub fn sample_distr<R: RngId + 'static, T>(
        &self,
        _rng_type: R,
        distribution: impl Distribution<T>,
    ) -> T
    where
        R::RngType: Rng,
    {
        let mut rng = self.get_rng::<R>();
        distribution.sample::<R::RngType>(&mut rng)
    }

    /// Gets a random sample within the range provided by `range`
    /// using the stream associated with the given [`RngId`].
    pub fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }
}
