//! Construct a boxed FEL from configuration.

use edmd_core::{FelStrategy, PelStrategy, SchedulerConfig};
use edmd_event::{HeapPel, MinMaxPel};

use crate::{CalendarFel, FutureEventList, TreeFel};

/// Bind the PEL type named by a [`PelStrategy`] to `$P` and evaluate `$body`.
macro_rules! with_pel {
    ($pel:expr, $P:ident => $body:expr) => {
        match $pel {
            PelStrategy::MinMax2 => {
                type $P = MinMaxPel<2>;
                $body
            }
            PelStrategy::MinMax3 => {
                type $P = MinMaxPel<3>;
                $body
            }
            PelStrategy::MinMax4 => {
                type $P = MinMaxPel<4>;
                $body
            }
            PelStrategy::MinMax8 => {
                type $P = MinMaxPel<8>;
                $body
            }
            PelStrategy::Heap => {
                type $P = HeapPel;
                $body
            }
        }
    };
}

/// The FEL named by `config.fel` over the PEL named by `config.pel`, sized
/// for `slots` particles.
pub fn build_fel(config: &SchedulerConfig, slots: usize) -> Box<dyn FutureEventList> {
    match config.fel {
        FelStrategy::Tree => with_pel!(config.pel, P => {
            Box::new(TreeFel::<P>::new(slots)) as Box<dyn FutureEventList>
        }),
        FelStrategy::Calendar => with_pel!(config.pel, P => {
            Box::new(CalendarFel::<P>::new(slots, &config.calendar)) as Box<dyn FutureEventList>
        }),
    }
}
