//! Search heuristics: local searches, path relinking and the restart driver.

pub mod construction;
pub mod fastmat;
pub mod local_search;
pub mod moves;
pub mod path_relinking;
pub mod resende;
pub mod whitaker;

pub use construction::{find_best_solutions, RunResult};
pub use local_search::{build_local_search, improve_pool, LocalSearch, MoveRules};
pub use path_relinking::{PathRelinking, RelinkOutcome};
pub use resende::ResendeWerneckSearch;
pub use whitaker::WhitakerSearch;
