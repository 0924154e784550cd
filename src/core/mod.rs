// Pipeline modules and shared errors
pub mod classification {
    pub use crate::classification::*;
}

pub mod geographic {
    pub use crate::geographic::*;
}

pub mod waterfall {
    pub use crate::waterfall::*;
}

pub mod scheduler {
    pub use crate::scheduler::*;
}

pub mod errors {
    pub use crate::errors::*;
}
