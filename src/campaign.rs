use std::fmt;

use clap::ValueEnum;

/// Data-taking campaigns with a pileup helper script available to run the generator
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Campaign {
    #[value(name = "2017")]
    Y2017,
    #[value(name = "2018")]
    Y2018,
}

impl fmt::Display for Campaign {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Campaign::Y2017 => write!(f, "2017"),
            Campaign::Y2018 => write!(f, "2018"),
        }
    }
}

impl Campaign {
    /// File name of the helper script that runs the generator for this campaign
    pub fn helper_script(&self) -> String {
        format!("runOffGridpack{self}Pileup.sh")
    }
}
