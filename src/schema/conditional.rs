//! Discriminant-conditioned deployment slots
//!
//! Several deployment slots are fed by one of two parameters depending on the
//! value of a discriminant parameter in the same section. Each slot is described
//! by a table row; the parameter evaluator in `param::conditional` interprets it.

/// How the live parameter's value maps onto the slot text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Projection {
    /// The slot holds the parameter's own encoding
    Direct,
    /// The slot may hold a float; the integer part is kept on decode
    Truncate,
    /// The slot holds `size_param` when the flag is set, `0` otherwise.
    /// Decoding sets the flag when the slot is greater than zero.
    Flag { size_param: &'static str },
}

/// The parameter feeding a slot for one discriminant outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub param: &'static str,
    pub projection: Projection,
}

impl Branch {
    #[must_use]
    pub const fn direct(param: &'static str) -> Self {
        Self {
            param,
            projection: Projection::Direct,
        }
    }

    #[must_use]
    pub const fn projected(param: &'static str, projection: Projection) -> Self {
        Self { param, projection }
    }
}

/// One deployment slot whose writer depends on a discriminant
#[derive(Debug)]
pub struct ConditionalSlot {
    /// Deployment slot name
    pub slot: &'static str,
    /// Key of the discriminant parameter, declared in the same section
    pub discriminant: &'static str,
    /// Discriminant value -> live branch
    pub branches: &'static [(&'static str, Branch)],
    /// Live branch for every other discriminant value
    pub otherwise: Branch,
}

impl ConditionalSlot {
    /// Branch that is live for the given discriminant value
    #[must_use]
    pub fn live_for(&self, discriminant: &str) -> &Branch {
        self.branches
            .iter()
            .find(|(value, _)| *value == discriminant)
            .map_or(&self.otherwise, |(_, branch)| branch)
    }

    /// Whether `param` is the live branch for the given discriminant value
    #[must_use]
    pub fn is_live(&self, param: &str, discriminant: &str) -> bool {
        self.live_for(discriminant).param == param
    }
}

const SCHEDULER: &str = "scheduler";
const BATCH: &str = "awsbatch";

pub static INITIAL_SIZE: ConditionalSlot = ConditionalSlot {
    slot: "DesiredSize",
    discriminant: SCHEDULER,
    branches: &[(BATCH, Branch::direct("desired_vcpus"))],
    otherwise: Branch::direct("initial_queue_size"),
};

pub static CEILING: ConditionalSlot = ConditionalSlot {
    slot: "MaxSize",
    discriminant: SCHEDULER,
    branches: &[(BATCH, Branch::direct("max_vcpus"))],
    otherwise: Branch::direct("max_queue_size"),
};

pub static PRICE: ConditionalSlot = ConditionalSlot {
    slot: "SpotPrice",
    discriminant: SCHEDULER,
    branches: &[(
        BATCH,
        Branch::projected("spot_bid_percentage", Projection::Truncate),
    )],
    otherwise: Branch::direct("spot_price"),
};

pub static FLOOR: ConditionalSlot = ConditionalSlot {
    slot: "MinSize",
    discriminant: SCHEDULER,
    branches: &[(BATCH, Branch::direct("min_vcpus"))],
    otherwise: Branch::projected(
        "maintain_initial_size",
        Projection::Flag {
            size_param: "initial_queue_size",
        },
    ),
};
