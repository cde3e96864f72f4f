/*!
 * Ercscope Core
 * 
 * Tipos, erros e traits compartilhados para a workspace Ercscope
 */

pub mod types;
pub mod traits;
pub mod utils;
pub mod error;

// Re-exportações públicas
pub use error::Error;
pub use types::*;
