pub(crate) mod feeder;
