use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::test_logger;

/// Runs `test_function` for the given number of iterations with a seeded random
/// number generator. The seed is printed so that failures can be reproduced by
/// setting `SHARC_SEED`.
pub fn random_test<F>(iterations: usize, test_function: F)
where
    F: FnMut(&mut StdRng),
{
    if let Ok(seed_str) = std::env::var("SHARC_SEED") {
        let seed = seed_str.parse::<u64>().expect("SHARC_SEED must be a valid u64");
        println!("seed: {seed} (fixed by SHARC_SEED)");
        run_seeded(seed, iterations, test_function);
        return;
    }

    let seed: u64 = rand::random();
    println!("random seed: {seed} (use SHARC_SEED=<seed> to set fixed seed)");
    run_seeded(seed, iterations, test_function);
}

/// Runs a random test with a fixed seed.
pub fn random_test_seeded<F>(seed: u64, iterations: usize, test_function: F)
where
    F: FnMut(&mut StdRng),
{
    println!("seed: {seed}");
    run_seeded(seed, iterations, test_function);
}

fn run_seeded<F>(seed: u64, iterations: usize, mut test_function: F)
where
    F: FnMut(&mut StdRng),
{
    test_logger();

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..iterations {
        test_function(&mut rng);
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn test_seeded_is_reproducible() {
        let mut first = Vec::new();
        random_test_seeded(42, 5, |rng| first.push(rng.random::<u64>()));

        let mut second = Vec::new();
        random_test_seeded(42, 5, |rng| second.push(rng.random::<u64>()));

        assert_eq!(first, second, "The same seed must produce the same sequence");
        assert_eq!(first.len(), 5);
    }
}
