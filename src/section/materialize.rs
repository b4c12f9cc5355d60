//! Inputs of section materialization

use super::Section;
use crate::config::deployment::CfnParams;
use crate::config::ini::IniDocument;
use crate::oracle::Oracle;
use crate::schema::Schema;

/// Representation a section is built from
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Defaults,
    File(&'a IniDocument),
    Deployment(&'a CfnParams),
    /// Instance `index` of a multi-instance kind in the deployment form
    DeploymentIndexed(&'a CfnParams, usize),
}

/// Whether the file form must contain the section's block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// Shared state while a tree is being materialized
///
/// Sections created through settings parameters are parked here until the
/// owning section is complete and the tree can take them.
pub struct Materializer<'s, 'o> {
    schema: &'s Schema,
    oracle: &'o dyn Oracle,
    referred: Vec<Section<'s>>,
}

impl<'s, 'o> Materializer<'s, 'o> {
    #[must_use]
    pub fn new(schema: &'s Schema, oracle: &'o dyn Oracle) -> Self {
        Self {
            schema,
            oracle,
            referred: Vec::new(),
        }
    }

    #[must_use]
    pub const fn schema(&self) -> &'s Schema {
        self.schema
    }

    #[must_use]
    pub fn oracle(&self) -> &'o dyn Oracle {
        self.oracle
    }

    pub fn refer(&mut self, section: Section<'s>) {
        self.referred.push(section);
    }

    /// Sections referred to since the last call
    pub fn take_referred(&mut self) -> Vec<Section<'s>> {
        core::mem::take(&mut self.referred)
    }
}
