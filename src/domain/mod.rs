// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer:
//
//   - NO Burn types here
//   - NO file I/O
//   - Only structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Text corpus splits and their lines
pub mod corpus;

// Which targets the language model learns to predict
pub mod objective;

// Core abstractions (traits) that other layers implement
pub mod traits;
