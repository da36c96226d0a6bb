// ABOUTME: Tool credit cost table supplied as external configuration, not hardcoded in handlers
// ABOUTME: Includes the tiered per-mode pricing formula for document parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Tool Credit Costs
//!
//! Each tool declares its own credit cost through this table. The table is
//! deserializable configuration so operations can reprice tools without a
//! code change; the defaults reproduce the shipped pricing.

use serde::{Deserialize, Serialize};

/// Page count at and below which document parsing is priced per page only
const PARSE_TIER_PAGE_THRESHOLD: u32 = 5;

/// Parsing mode, priced independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentParseMode {
    /// Plain text extraction
    Standard,
    /// OCR-backed extraction for scanned documents
    Ocr,
}

/// Per-mode parse rates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParseModeRates {
    /// Flat component applied once the page count passes the tier threshold
    pub base_rate: u32,
    /// Per-page component
    pub per_page_rate: u32,
}

/// Credit cost table for every metered tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCostTable {
    /// Knowledge-base context query
    pub context_query: u32,
    /// Document upload / ingestion
    pub document_ingest: u32,
    /// Web search
    pub web_search: u32,
    /// Standard-mode parse rates
    pub parse_standard: ParseModeRates,
    /// OCR-mode parse rates
    pub parse_ocr: ParseModeRates,
}

impl Default for ToolCostTable {
    fn default() -> Self {
        Self {
            context_query: 2,
            document_ingest: 3,
            web_search: 2,
            parse_standard: ParseModeRates {
                base_rate: 5,
                per_page_rate: 1,
            },
            parse_ocr: ParseModeRates {
                base_rate: 10,
                per_page_rate: 2,
            },
        }
    }
}

impl ToolCostTable {
    /// Cost of parsing a document of `pages` pages in the given mode
    ///
    /// Small documents are priced per page; past the tier threshold the flat
    /// base rate covers the first pages and the remainder is per page:
    /// `pages <= 5 ? pages * per_page : base + (pages - 5) * per_page`.
    #[must_use]
    pub fn document_parse_cost(&self, mode: DocumentParseMode, pages: u32) -> u32 {
        let rates = match mode {
            DocumentParseMode::Standard => self.parse_standard,
            DocumentParseMode::Ocr => self.parse_ocr,
        };
        if pages <= PARSE_TIER_PAGE_THRESHOLD {
            pages * rates.per_page_rate
        } else {
            rates.base_rate + (pages - PARSE_TIER_PAGE_THRESHOLD) * rates.per_page_rate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cost_below_threshold() {
        let table = ToolCostTable::default();
        assert_eq!(table.document_parse_cost(DocumentParseMode::Standard, 3), 3);
        assert_eq!(table.document_parse_cost(DocumentParseMode::Ocr, 3), 6);
    }

    #[test]
    fn test_parse_cost_at_threshold() {
        let table = ToolCostTable::default();
        assert_eq!(table.document_parse_cost(DocumentParseMode::Standard, 5), 5);
    }

    #[test]
    fn test_parse_cost_above_threshold() {
        let table = ToolCostTable::default();
        // base 5 + 7 extra pages at 1/page
        assert_eq!(
            table.document_parse_cost(DocumentParseMode::Standard, 12),
            12
        );
        // base 10 + 7 extra pages at 2/page
        assert_eq!(table.document_parse_cost(DocumentParseMode::Ocr, 12), 24);
    }

    #[test]
    fn test_zero_pages_costs_nothing() {
        let table = ToolCostTable::default();
        assert_eq!(table.document_parse_cost(DocumentParseMode::Standard, 0), 0);
    }
}
