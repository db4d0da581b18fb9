use pstable_lsh::{
    build_hasher, collision_probability, collision_probability_with, compare, estimate_similarity,
    hash_vector, HasherConfig, IntegrationConfig, LshError, PStableError, PStableHasher,
};

fn base() -> HasherConfig {
    HasherConfig::new(4.0, 4).with_num_perm(32)
}

fn hashed(config: HasherConfig) -> PStableHasher {
    let dim = config.dim;
    let mut hasher = PStableHasher::new(config).expect("construct");
    hasher.hash(&vec![0.0; dim]).expect("hash");
    hasher
}

#[test]
fn unsupported_metric_is_rejected_at_construction() {
    let result = PStableHasher::new(base().with_metric_dim(3));
    assert!(matches!(
        result,
        Err(PStableError::UnsupportedMetric { metric_dim: 3 })
    ));
}

#[test]
fn short_vector_is_not_truncated_or_padded() {
    let mut hasher = PStableHasher::new(base()).expect("construct");
    let result = hasher.hash(&[1.0, 2.0, 3.0]);
    assert!(matches!(
        result,
        Err(PStableError::DimensionMismatch {
            expected: 4,
            actual: 3
        })
    ));
    assert!(!hasher.is_hashed());
}

#[test]
fn seed_mismatch_is_reported() {
    let a = hashed(base().with_seed(1));
    let b = hashed(base().with_seed(2));
    assert_eq!(
        estimate_similarity(&a, &b),
        Err(PStableError::SeedMismatch { left: 1, right: 2 })
    );
}

#[test]
fn compatibility_checks_follow_fixed_order() {
    let a = hashed(base());

    // Everything differs: seed wins.
    let b = hashed(base().with_seed(9).with_dim(2).with_num_perm(8).with_metric_dim(1));
    assert!(matches!(
        estimate_similarity(&a, &b),
        Err(PStableError::SeedMismatch { .. })
    ));

    // Dimension before projection count and metric.
    let b = hashed(base().with_dim(2).with_num_perm(8).with_metric_dim(1));
    assert!(matches!(
        estimate_similarity(&a, &b),
        Err(PStableError::DimensionMismatch { .. })
    ));

    // Projection count before metric.
    let b = hashed(base().with_num_perm(8).with_metric_dim(1));
    assert!(matches!(
        estimate_similarity(&a, &b),
        Err(PStableError::PermutationCountMismatch { .. })
    ));

    let b = hashed(base().with_metric_dim(1));
    assert!(matches!(
        estimate_similarity(&a, &b),
        Err(PStableError::MetricMismatch { .. })
    ));
}

#[test]
fn comparing_unhashed_hasher_fails() {
    let a = hashed(base());
    let b = PStableHasher::new(base()).expect("construct");
    assert_eq!(estimate_similarity(&a, &b), Err(PStableError::NotHashed));
}

#[test]
fn zero_distance_is_left_to_the_caller() {
    assert!(matches!(
        collision_probability(&base(), 0.0),
        Err(PStableError::InvalidDistance { .. })
    ));
}

#[test]
fn integration_budget_is_enforced() {
    let tight = IntegrationConfig::new().with_max_depth(2);
    assert!(matches!(
        collision_probability_with(&base(), 1e-5, &tight),
        Err(PStableError::IntegrationFailed { .. })
    ));
}

#[test]
fn helper_errors_carry_their_stage() {
    assert!(matches!(
        build_hasher(&base().with_num_perm(0)),
        Err(LshError::Construct(PStableError::InvalidPermutationCount { num_perm: 0 }))
    ));

    let mut hasher = build_hasher(&base()).expect("construct");
    assert!(matches!(
        hash_vector(&mut hasher, &[0.0; 0]),
        Err(LshError::Hash(PStableError::DimensionMismatch { .. }))
    ));

    let other = build_hasher(&base()).expect("construct");
    assert!(matches!(
        compare(&hasher, &other),
        Err(LshError::Compare(PStableError::NotHashed))
    ));
}

#[test]
fn errors_do_not_poison_the_hasher() {
    let mut hasher = PStableHasher::new(base()).expect("construct");
    assert!(hasher.hash(&[1.0]).is_err());
    assert!(hasher.hash(&[1.0, 2.0, 3.0, 4.0]).is_ok());
    assert_eq!(hasher.len(), 32);
}
