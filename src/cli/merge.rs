// merge.rs - Merge configuration file with CLI arguments

use crate::cli::args::{AlleleCallArgs, Command, CreateSchemaArgs, PrepExternalSchemaArgs};
use crate::cli::validation::parse_prediction_mode;
use crate::cli::Config;

fn fill<T>(value: &mut Option<T>, config: Option<T>) {
    if value.is_none() {
        *value = config;
    }
}

fn fill_flag(flag: &mut bool, config: Option<bool>) {
    if !*flag && config.unwrap_or(false) {
        *flag = true;
    }
}

impl CreateSchemaArgs {
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(&mut self, config: &Config) -> Result<(), String> {
        let config = config.clone();
        fill(&mut self.input_files, config.input_files);
        fill(&mut self.output_directory, config.output_directory);
        fill(&mut self.schema_name, config.schema_name);
        fill(&mut self.training_file, config.training_file);

        fill(&mut self.blast_score_ratio, config.blast_score_ratio);
        fill(&mut self.minimum_length, config.minimum_length);
        fill(&mut self.translation_table, config.translation_table);
        fill(&mut self.size_threshold, config.size_threshold);
        fill(&mut self.cpu_cores, config.cpu_cores);
        if self.prediction_mode.is_none() {
            self.prediction_mode = config
                .prediction_mode
                .as_deref()
                .map(parse_prediction_mode)
                .transpose()?;
        }

        fill(&mut self.word_size, config.word_size);
        fill(&mut self.window_size, config.window_size);
        fill(&mut self.clustering_sim, config.clustering_sim);
        fill(&mut self.representative_filter, config.representative_filter);
        fill(&mut self.intra_filter, config.intra_filter);

        fill_flag(&mut self.cds_input, config.cds_input);
        fill_flag(&mut self.no_cleanup, config.no_cleanup);
        Ok(())
    }
}

impl AlleleCallArgs {
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(&mut self, config: &Config) -> Result<(), String> {
        let config = config.clone();
        fill(&mut self.input_files, config.input_files);
        fill(&mut self.schema_directory, config.schema_directory);
        fill(&mut self.output_directory, config.output_directory);
        fill(&mut self.training_file, config.training_file);
        fill(&mut self.genes_list, config.genes_list);

        fill(&mut self.blast_score_ratio, config.blast_score_ratio);
        fill(&mut self.minimum_length, config.minimum_length);
        fill(&mut self.translation_table, config.translation_table);
        fill(&mut self.size_threshold, config.size_threshold);
        fill(&mut self.cpu_cores, config.cpu_cores);
        if self.prediction_mode.is_none() {
            self.prediction_mode = config
                .prediction_mode
                .as_deref()
                .map(parse_prediction_mode)
                .transpose()?;
        }
        fill(&mut self.mode, config.mode);
        fill(&mut self.hash_profiles, config.hash_profiles);

        fill_flag(&mut self.cds_input, config.cds_input);
        fill_flag(&mut self.no_inferred, config.no_inferred);
        fill_flag(&mut self.output_unclassified, config.output_unclassified);
        fill_flag(&mut self.output_missing, config.output_missing);
        fill_flag(&mut self.output_novel, config.output_novel);
        fill_flag(&mut self.no_cleanup, config.no_cleanup);
        fill_flag(&mut self.force_continue, config.force_continue);
        Ok(())
    }
}

impl PrepExternalSchemaArgs {
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(&mut self, config: &Config) -> Result<(), String> {
        let config = config.clone();
        fill(&mut self.input_files, config.input_files);
        fill(&mut self.output_directory, config.output_directory);
        fill(&mut self.training_file, config.training_file);
        fill(&mut self.blast_score_ratio, config.blast_score_ratio);
        fill(&mut self.minimum_length, config.minimum_length);
        fill(&mut self.translation_table, config.translation_table);
        fill(&mut self.size_threshold, config.size_threshold);
        fill(&mut self.cpu_cores, config.cpu_cores);
        fill_flag(&mut self.size_filter, config.size_filter);
        Ok(())
    }
}

impl Command {
    /// Load configuration and merge it into the subcommand arguments
    pub fn with_config_file(&mut self, config_path: &str) -> Result<(), String> {
        let config = Config::from_file(config_path)?;
        match self {
            Command::CreateSchema(args) => args.merge_with_config(&config),
            Command::AlleleCall(args) => args.merge_with_config(&config),
            Command::PrepExternalSchema(args) => args.merge_with_config(&config),
            _ => {
                log::info!("{} takes no values from the config file", self.name());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PredictionMode;

    fn prep_args() -> PrepExternalSchemaArgs {
        PrepExternalSchemaArgs {
            input_files: Some("cli_inputs".to_string()),
            output_directory: None,
            training_file: None,
            blast_score_ratio: None,
            minimum_length: None,
            translation_table: Some(4),
            size_threshold: None,
            size_filter: false,
            cpu_cores: None,
        }
    }

    #[test]
    fn test_cli_values_take_precedence() {
        let config = Config {
            input_files: Some("config_inputs".to_string()),
            output_directory: Some("config_output".to_string()),
            translation_table: Some(11),
            blast_score_ratio: Some(0.7),
            size_filter: Some(true),
            ..Config::new()
        };
        let mut args = prep_args();
        args.merge_with_config(&config).unwrap();
        assert_eq!(args.input_files.as_deref(), Some("cli_inputs"));
        assert_eq!(args.output_directory.as_deref(), Some("config_output"));
        assert_eq!(args.translation_table, Some(4));
        assert_eq!(args.blast_score_ratio, Some(0.7));
        assert!(args.size_filter);
    }

    #[test]
    fn test_prediction_mode_from_config() {
        let config = Config {
            prediction_mode: Some("meta".to_string()),
            ..Config::new()
        };
        let mut args = CreateSchemaArgs {
            input_files: None,
            output_directory: None,
            schema_name: None,
            training_file: None,
            blast_score_ratio: None,
            minimum_length: None,
            translation_table: None,
            size_threshold: None,
            no_size_threshold: false,
            word_size: None,
            window_size: None,
            clustering_sim: None,
            representative_filter: None,
            intra_filter: None,
            cpu_cores: None,
            prediction_mode: None,
            cds_input: false,
            no_cleanup: false,
        };
        args.merge_with_config(&config).unwrap();
        assert_eq!(args.prediction_mode, Some(PredictionMode::Meta));
    }
}
