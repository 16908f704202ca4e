mod test_round_trip;
mod test_from_yaml;
