#[cfg(test)]
mod tests {
    use crate::ik::IkConfig;
    use crate::model_error::ModelError;
    use crate::tests::test_utils::IK_CONFIG;

    const READ_ERROR: &'static str = "Failed to load solver settings from file";

    #[test]
    fn test_ik_config_from_yaml() {
        let loaded = IkConfig::from_yaml_file(IK_CONFIG).expect(READ_ERROR);
        let expected = IkConfig {
            max_iterations: 500,
            gradient_tolerance: 1.0e-12,
            finite_difference_step: 1.0e-7,
            max_line_search_steps: 30,
        };
        assert_eq!(expected, loaded);
    }

    #[test]
    fn test_missing_file() {
        let err = IkConfig::from_yaml_file("src/tests/data/absent.yaml").unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }), "{:?}", err);
    }
}
