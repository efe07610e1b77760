pub(crate) mod area;
pub(crate) mod bootstrap;
pub(crate) mod loop_runner;

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
