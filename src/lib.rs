/*!
# FRESH CHECKS QR Gate

An event check-in gate: a coordinator logs in, scans a student's QR code,
the server looks the code up in a Google-Sheets-backed roster, displays the
record, and marks it used exactly once with a status and comment.

## Architecture

The spreadsheet is the only durable store. It is read fresh on every
operation — no local cache, no local database — so concurrent coordinators
always see current data at the cost of a full-sheet read per request.

### Request flow

login → scan → `/fetch` (locate the record, reject consumed codes) →
result page → `/update` (batched cell write marking the row used) →
session cleared, forcing a fresh login before the next scan.

### Backing store

Google Sheets REST API v4 with a service-account bearer token; credentials
arrive as a base64 blob in the environment. The store sits behind the
narrow [`sheet::SheetStore`] trait so the check-in core runs against an
in-memory sheet in tests.

## Modules

- **columns**: logical fields, header variants, column resolution
- **student**: the student record and its display projection
- **checkin**: QR matching cascade and the check-in write plan
- **sheet**: the `SheetStore` trait and the Google Sheets client
- **login**: coordinator credentials, sessions, auth middleware
- **ratelimit**: per-client sliding-window rate limiter
- **config**: environment-driven configuration
- **error**: error taxonomy and HTTP mapping
- **app**: routing and handlers

## HTTP surface

- `GET/POST /login`, `GET /logout` — coordinator authentication
- `GET /scan` — scanner page (authenticated)
- `POST /fetch` — look up a scanned code
- `POST /update` — record the verdict and consume the code
- `GET /health` — liveness probe with sheet connectivity report
*/

pub mod app;
pub mod checkin;
pub mod columns;
pub mod config;
pub mod error;
pub mod login;
pub mod ratelimit;
pub mod sheet;
pub mod student;

pub use checkin::{Status, locate, update};
pub use columns::{ColumnMapping, Field, FixedLayout};
pub use error::{GateError, Result};
pub use sheet::SheetStore;
pub use student::StudentRecord;
