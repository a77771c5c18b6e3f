//! How much a run reports about itself.
//!
//! A `Verbosity` is passed explicitly into every entry point that prints.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verbosity(u32);

impl Verbosity {
    pub const RESULT : u32 =  1;
    pub const LABEL  : u32 =  2;
    pub const PROCESS: u32 =  4;
    pub const STATS  : u32 =  8;
    pub const FULL   : u32 = 16;
    pub const TIME   : u32 = 32;

    pub fn new(bits: u32) -> Self { Self(bits) }
    pub fn silent() -> Self { Self(0) }

    pub fn result (self) -> bool { self.has(Self::RESULT ) }
    pub fn label  (self) -> bool { self.has(Self::LABEL  ) }
    pub fn process(self) -> bool { self.has(Self::PROCESS) }
    pub fn stats  (self) -> bool { self.has(Self::STATS  ) }
    pub fn full   (self) -> bool { self.has(Self::FULL   ) }
    pub fn time   (self) -> bool { self.has(Self::TIME   ) }

    fn has(self, bit: u32) -> bool { self.0 & bit != 0 }
}

impl std::str::FromStr for Verbosity {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(s.trim().parse()?)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(/**/ bits, label, process, full ,
             case( 0  , false, false  , false),
             case( 7  , true , true   , false),
             case(16  , false, false  , true ),
             case(63  , true , true   , true ),
    )]
    fn flags(bits: u32, label: bool, process: bool, full: bool) {
        let v: Verbosity = bits.to_string().parse().unwrap();
        assert_eq!((v.label(), v.process(), v.full()), (label, process, full));
    }
}
