//! Lifeflow Core -- resource and life-support simulation for crewed vessels.
//!
//! Every vessel owns a set of capacity-bounded resource stocks. Crew rules,
//! processes and part devices turn nominal rates into recipes, and a shared
//! executor runs each batch of recipes to a fixed point so that scarce
//! resources are split deterministically and byproducts feed later stages
//! within the same tick.
//!
//! # Front-ends
//!
//! - [`tick::TickSimulator`] -- advances one vessel by an elapsed time slice,
//!   accumulating rule problems and emitting notifications.
//! - [`projection::ProjectionSimulator`] -- computes steady-state rates and
//!   lifetimes for a planned vessel without touching any persistent state.
//! - [`simulation::Simulation`] -- owns many vessels, ticks them in key
//!   order, and turns notifications into [`event::Event`]s.
//!
//! # Key Types
//!
//! - [`catalog::ProfileCatalog`] -- Immutable, validated definitions of
//!   resources, rules, processes and supplies (built by
//!   [`catalog::CatalogBuilder`]).
//! - [`stock::ResourceStock`] -- A bounded amount with per-tick accounting
//!   and per-broker contributions.
//! - [`recipe::Recipe`] -- Inputs and outputs executed as a fraction of a
//!   whole; [`recipe::execute_recipes`] is the fixed-point executor.
//! - [`context::SimulationContext`] -- Everything one vessel needs to be
//!   ticked; snapshots via [`serialize`].

pub mod catalog;
pub mod context;
pub mod crew;
pub mod event;
pub mod hash;
pub mod id;
pub mod modifier;
pub mod process;
pub mod projection;
pub mod recipe;
pub mod rule;
pub mod serialize;
pub mod settings;
pub mod simulation;
pub mod stock;
pub mod supply;
pub mod tick;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
