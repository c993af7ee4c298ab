//! # Newsletter Context
//!
//! A retrieval-and-ranking engine for ingested newsletters: given a user's
//! natural-language query, a recency window in days, and a result cap, it
//! returns the most relevant content chunks with provenance metadata and a
//! relevance score.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌─────────────────┐
//! │ Ingest (JSON │──▶│ Chunk Store │◀──│  Recency Index   │
//! │ pre-embedded)│   │ append-only │   │ (by published_at)│
//! └──────────────┘   └──────┬──────┘   └────────┬────────┘
//!                           │                   │
//!              ┌────────────┴───────┐           │
//!              ▼                    ▼           ▼
//!        ┌──────────┐   ┌───────────────────────────────┐
//!        │   HTTP   │──▶│ Admission ─▶ Embed ─▶ Rank    │
//!        │  (axum)  │   │        Retrieval Engine       │
//!        └──────────┘   └───────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! nlctx ingest bundles.json        # load pre-chunked, pre-embedded content
//! nlctx query "ai funding" --days 7 --max-results 5
//! nlctx serve                      # start the HTTP query API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and query validation |
//! | [`store`] | Append-only chunk store with recency index |
//! | [`ranker`] | Cosine similarity and bounded top-K selection |
//! | [`limiter`] | Token-bucket admission control |
//! | [`embedding`] | Query embedder providers |
//! | [`engine`] | Query orchestration |
//! | [`ingest`] | Pre-embedded bundle loading |
//! | [`server`] | HTTP query API |

pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod limiter;
pub mod models;
pub mod ranker;
pub mod server;
pub mod store;
