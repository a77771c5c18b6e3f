use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Parse a comma-separated list of values
pub fn parse_list<T: FromStr>(s: &str) -> Result<Vec<T>, <T as FromStr>::Err> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse)
        .collect()
}

/// Parse `x,y,z`. A single value is used for all three components.
pub fn parse_triplet<T: FromStr + Copy>(s: &str) -> Result<(T,T,T), String>
where
    <T as FromStr>::Err: std::fmt::Display,
{
    let v = parse_list::<T>(s).map_err(|e| e.to_string())?;
    match v[..] {
        [x]       => Ok((x, x, x)),
        [x, y, z] => Ok((x, y, z)),
        _         => Err(format!("expected 1 or 3 comma-separated values, found {}", v.len())),
    }
}

/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}

/// Smallest power of two not less than `n` (1 for 0)
pub fn next_power_of_two(n: usize) -> usize { n.max(1).next_power_of_two() }

/// Rewrite single-dash long options (`-forward 4`) into the `--forward 4`
/// form understood by clap. Negative numbers and short flags are left alone.
pub fn long_options<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let mut chars = arg.chars();
            let single_dash_word = chars.next() == Some('-')
                && chars.next().map_or(false, |c| c.is_ascii_alphabetic())
                && chars.next().is_some();
            if i > 0 && single_dash_word { format!("-{arg}") } else { arg }
        })
        .collect()
}

/// Cooperative cancellation, polled at natural checkpoints (between particles,
/// between POCS cycles).
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self { Self::default() }
    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed) }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }

    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() { Err(crate::RadonError::Cancelled) } else { Ok(()) }
    }
}


pub mod timing {

    use super::group_digits;
    use std::time::Instant;
    use std::io::Write;

    /// Reports the duration of successive stages of a run. Does nothing when
    /// constructed disabled.
    pub struct Progress {
        previous: Instant,
        enabled: bool,
    }

    impl Progress {

        pub fn new(enabled: bool) -> Self { Self { previous: Instant::now(), enabled } }

        /// Print message, append ellipsis, flush stdout, stay on same line, start timer.
        pub fn start(&mut self, message: &str) {
            if self.enabled {
                print!("{message} ... ");
                // Failing to flush only delays the message
                let _ = std::io::stdout().flush();
            }
            self.start_timer();
        }

        /// Print message, go to next line, start timer
        pub fn startln(&mut self, message: &str) {
            if self.enabled { println!("{message} ..."); }
            self.start_timer();
        }

        // Print time elapsed since last start or done
        pub fn done(&mut self) {
            if self.enabled {
                println!("{} ms", group_digits(self.previous.elapsed().as_millis()));
            }
            self.start_timer();
        }

        // Print message followed by time elapsed since last start or done
        pub fn done_with_message(&mut self, message: &str) {
            if self.enabled {
                println!("{message}: {} ms",
                         group_digits(self.previous.elapsed().as_millis()));
            }
            self.start_timer();
        }

        fn start_timer(&mut self) { self.previous = Instant::now() }
    }
}
