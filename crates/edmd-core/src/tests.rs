//! Unit tests for edmd-core primitives.

#[cfg(test)]
mod ids {
    use crate::{CellId, ParticleId, SourceId};

    #[test]
    fn index_roundtrip() {
        let id = ParticleId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(ParticleId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(ParticleId::INVALID.0, u32::MAX);
        assert_eq!(CellId::INVALID.0, u32::MAX);
        assert_eq!(SourceId::INVALID.0, u16::MAX);
        assert!(!ParticleId::default().is_valid());
    }

    #[test]
    fn source_id_rejects_out_of_range() {
        assert!(SourceId::try_from(70_000usize).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(ParticleId(7).to_string(), "ParticleId(7)");
    }
}

#[cfg(test)]
mod pairs {
    use crate::{PairKey, PairMap, ParticleId};

    #[test]
    fn order_independent() {
        let a = ParticleId(3);
        let b = ParticleId(9);
        assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
        assert_eq!(PairKey::new(b, a).lo(), a);
        assert_eq!(PairKey::new(a, b).packed(), (3u64 << 32) | 9);
    }

    #[test]
    fn other_member() {
        let k = PairKey::new(ParticleId(1), ParticleId(2));
        assert_eq!(k.other(ParticleId(1)), Some(ParticleId(2)));
        assert_eq!(k.other(ParticleId(5)), None);
    }

    #[test]
    fn map_merges_both_orders() {
        let mut m: PairMap<u32> = PairMap::default();
        *m.entry(PairKey::new(ParticleId(4), ParticleId(1))).or_default() += 1;
        *m.entry(PairKey::new(ParticleId(1), ParticleId(4))).or_default() += 1;
        assert_eq!(m.len(), 1);
        assert_eq!(m[&PairKey::new(ParticleId(1), ParticleId(4))], 2);
    }
}

#[cfg(test)]
mod config {
    use crate::{CoreError, FelStrategy, PelStrategy, SchedulerConfig};

    #[test]
    fn default_is_valid() {
        SchedulerConfig::default().validate().unwrap();
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!("cbt".parse::<FelStrategy>().unwrap(), FelStrategy::Tree);
        assert_eq!("Calendar".parse::<FelStrategy>().unwrap(), FelStrategy::Calendar);
        assert_eq!("heap".parse::<PelStrategy>().unwrap(), PelStrategy::Heap);
        assert_eq!(PelStrategy::MinMax8.capacity(), Some(8));
    }

    #[test]
    fn unknown_strategy_is_reported() {
        let err = "splay".parse::<FelStrategy>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownStrategy { what: "FEL", .. }));
        assert!(err.to_string().contains("splay"));
    }

    #[test]
    fn zero_cell_count_rejected() {
        let mut cfg = SchedulerConfig::default();
        cfg.cells.cell_counts = Some(vec![4, 0, 4]);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("dimension 1"));
    }

    #[test]
    fn zero_overlink_rejected() {
        let mut cfg = SchedulerConfig::default();
        cfg.cells.overlink = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn nan_tolerance_rejected() {
        let mut cfg = SchedulerConfig::default();
        cfg.negative_time_tolerance = f64::NAN;
        assert!(cfg.validate().is_err());
    }
}

#[cfg(test)]
mod rng {
    use crate::{ParticleId, SimRng};

    #[test]
    fn same_seed_same_stream() {
        let mut a = SimRng::for_particle(7, ParticleId(3));
        let mut b = SimRng::for_particle(7, ParticleId(3));
        for _ in 0..16 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn exponential_mean_is_close() {
        let mut rng = SimRng::new(42);
        let n = 20_000;
        let mean = (0..n).map(|_| rng.exponential(2.0)).sum::<f64>() / n as f64;
        assert!((mean - 2.0).abs() < 0.1, "mean {mean}");
    }

    #[test]
    fn exponential_is_non_negative() {
        let mut rng = SimRng::new(1);
        assert!((0..1000).all(|_| rng.exponential(1.0) >= 0.0));
    }

    #[test]
    fn normal_has_unit_variance() {
        let mut rng = SimRng::new(9);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| rng.normal()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
    }
}
