use clap::ValueEnum;
use trice_id::SearchMethod;

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum SearchMethodFlag {
    Random,
    Upward,
    Downward,
}

impl SearchMethodFlag {
    pub(crate) const fn as_domain(self) -> SearchMethod {
        match self {
            SearchMethodFlag::Random => SearchMethod::Random,
            SearchMethodFlag::Upward => SearchMethod::Upward,
            SearchMethodFlag::Downward => SearchMethod::Downward,
        }
    }
}
