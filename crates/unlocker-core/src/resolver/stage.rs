//! Stage table - ドメイン述語 → 変換 の順序付きリスト
//!
//! チェーンは先頭から順に評価し、現在のリンクにマッチしたステージだけが
//! リモート呼び出しを行う。どのステージにもマッチしなければ `Unmatched`。

use std::collections::BTreeSet;

use crate::config::Settings;

use super::domains::DomainSet;
use super::registry::Capability;

/// What a matching stage does with the current link.
#[derive(Debug, Clone)]
pub enum StageKind {
    /// One call resolves straight to the final link.
    Shortcut { capability: Capability },

    /// Chase intermediate links until a final-family domain shows up.
    BypassLoop(BypassLoop),

    /// Rewrite the current link, or fail the chain.
    Rewrite { capability: Capability },

    /// Produce the final link plus selection metadata, or fail the chain.
    Terminal { capability: Capability },

    /// The current link already is final.
    PassThrough,
}

#[derive(Debug, Clone)]
pub struct BypassLoop {
    pub max_iterations: u32,
    /// Reaching any of these stops the loop.
    pub final_family: DomainSet,
    /// First matching route wins; `fallback` otherwise.
    pub routes: Vec<BypassRoute>,
    pub fallback: BypassRoute,
}

impl BypassLoop {
    pub fn route_for(&self, url: &str) -> &BypassRoute {
        self.routes
            .iter()
            .find(|r| r.matcher.matches(url))
            .unwrap_or(&self.fallback)
    }
}

#[derive(Debug, Clone)]
pub struct BypassRoute {
    /// Log prefix, e.g. "Timer bypass via VPS".
    pub label: String,
    pub matcher: DomainSet,
    pub capability: Capability,
}

impl BypassRoute {
    pub fn new(label: impl Into<String>, matcher: DomainSet, capability: impl Into<Capability>) -> Self {
        Self {
            label: label.into(),
            matcher,
            capability: capability.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stage {
    /// Human readable name used in logs ("HubCloud", "HBLinks", ...).
    pub label: String,
    /// Whether the stage applies to the current link.
    pub matcher: DomainSet,
    pub kind: StageKind,
}

impl Stage {
    pub fn new(label: impl Into<String>, matcher: DomainSet, kind: StageKind) -> Self {
        Self {
            label: label.into(),
            matcher,
            kind,
        }
    }

    pub fn capabilities(&self) -> Vec<&Capability> {
        match &self.kind {
            StageKind::Shortcut { capability }
            | StageKind::Rewrite { capability }
            | StageKind::Terminal { capability } => vec![capability],
            StageKind::BypassLoop(lp) => lp
                .routes
                .iter()
                .chain(std::iter::once(&lp.fallback))
                .map(|r| &r.capability)
                .collect(),
            StageKind::PassThrough => Vec::new(),
        }
    }
}

/// Ordered stages. Evaluation order is the vector order.
#[derive(Debug, Clone, Default)]
pub struct StageTable {
    stages: Vec<Stage>,
}

impl StageTable {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// fast path → bypass loop → link page → drive → cloud → pass-through
    pub fn from_settings(settings: &Settings) -> Self {
        let stages = &settings.stages;
        let bypass = BypassLoop {
            max_iterations: settings.pipeline.bypass_max_iterations,
            final_family: DomainSet::from(stages.final_family.as_slice()),
            routes: vec![BypassRoute::new(
                "GadgetsWeb native solve",
                DomainSet::from(stages.native_bypass.as_slice()),
                Capability::NATIVE_BYPASS,
            )],
            fallback: BypassRoute::new(
                "Timer bypass via VPS",
                DomainSet::empty(),
                Capability::TIMER_BYPASS,
            ),
        };

        Self::new(vec![
            Stage::new(
                "HubCDN.fans",
                DomainSet::from(stages.fast_path.as_slice()),
                StageKind::Shortcut {
                    capability: Capability::FAST_PATH.into(),
                },
            ),
            Stage::new(
                "Timer bypass",
                DomainSet::from(settings.routing.bypass_domains.as_slice()),
                StageKind::BypassLoop(bypass),
            ),
            Stage::new(
                "HBLinks",
                DomainSet::from(stages.link_page.as_slice()),
                StageKind::Rewrite {
                    capability: Capability::LINK_PAGE.into(),
                },
            ),
            Stage::new(
                "HubDrive",
                DomainSet::from(stages.drive.as_slice()),
                StageKind::Rewrite {
                    capability: Capability::DRIVE.into(),
                },
            ),
            Stage::new(
                "HubCloud",
                DomainSet::from(stages.cloud.as_slice()),
                StageKind::Terminal {
                    capability: Capability::CLOUD.into(),
                },
            ),
            Stage::new(
                "GDflix/DriveHub",
                DomainSet::from(stages.pass_through.as_slice()),
                StageKind::PassThrough,
            ),
        ])
    }

    pub fn standard() -> Self {
        Self::from_settings(&Settings::default())
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Every capability some stage may call.
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        self.stages
            .iter()
            .flat_map(Stage::capabilities)
            .cloned()
            .collect()
    }
}
