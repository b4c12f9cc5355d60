//! Integration tests for conversions between the file and deployment forms

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {

    use clusterconf::config::deployment::CfnParams;
    use clusterconf::config::ini::IniDocument;
    use clusterconf::config::{BuildOptions, ClusterConfig};
    use clusterconf::oracle::StaticOracle;
    use clusterconf::param::value::ParamValue;
    use clusterconf::schema::Schema;
    use clusterconf::section::Section;

    fn from_text<'s>(schema: &'s Schema, text: &str, oracle: &StaticOracle) -> ClusterConfig<'s> {
        let document = IniDocument::parse(text).unwrap();
        ClusterConfig::from_file(schema, &document, &BuildOptions::default(), oracle).unwrap()
    }

    fn cluster_value<'a>(config: &'a ClusterConfig<'_>, key: &str) -> &'a ParamValue {
        config.cluster_section().unwrap().value(key).unwrap()
    }

    #[test]
    fn defaults_round_trip_through_an_empty_file() {
        let oracle = StaticOracle::new();
        let schema = Schema::global();
        let defaults = ClusterConfig::from_defaults(schema, &oracle).unwrap();

        let document = defaults.to_file();
        assert!(document.is_empty());
        assert_eq!(document.render(), "");

        let reread = ClusterConfig::from_file(schema, &document, &BuildOptions::default(), &oracle)
            .unwrap();
        assert_eq!(reread, defaults);
    }

    #[test]
    fn defaults_round_trip_through_the_deployment_form() {
        let oracle = StaticOracle::new();
        let schema = Schema::global();
        let defaults = ClusterConfig::from_defaults(schema, &oracle).unwrap();

        let cfn = defaults.to_cfn(&oracle).unwrap();
        assert_eq!(cfn.get("Scheduler"), "sge");
        assert_eq!(cfn.get("DesiredSize"), "0");
        assert_eq!(cfn.get("MaxSize"), "10");
        assert_eq!(cfn.get("MinSize"), "0");
        assert_eq!(cfn.get("SpotPrice"), "10");
        assert_eq!(cfn.get("SharedDir"), "/shared");
        assert_eq!(cfn.get("ScaleDownIdleTime"), "10");
        assert_eq!(cfn.get("VPCId"), "NONE");
        assert_eq!(cfn.get("NumberOfEBSVol"), "1");
        assert_eq!(cfn.get("VolumeSize"), "20,20,20,20,20");
        assert_eq!(cfn.get("EFSOptions"), "NONE,NONE,NONE,NONE,NONE,NONE,NONE,NONE");
        assert_eq!(cfn.get("RAIDOptions"), "NONE,NONE,NONE,NONE,NONE,NONE,NONE,NONE");
        assert_eq!(cfn.get("CLITemplate"), "default");
        assert_eq!(cfn.get("ExtraJson"), "{}");

        let decoded = ClusterConfig::from_deployment(schema, &cfn, &oracle).unwrap();
        assert_eq!(decoded, defaults);
    }

    #[test]
    fn discriminant_selects_the_live_parameter() {
        let oracle = StaticOracle::new();
        let schema = Schema::global();

        let batch = CfnParams::new()
            .with("Scheduler", "awsbatch")
            .with("DesiredSize", "7");
        let config = ClusterConfig::from_deployment(schema, &batch, &oracle).unwrap();
        assert_eq!(cluster_value(&config, "desired_vcpus"), &ParamValue::Int(7));
        assert_eq!(cluster_value(&config, "initial_queue_size"), &ParamValue::Int(0));

        let slurm = CfnParams::new()
            .with("Scheduler", "slurm")
            .with("DesiredSize", "7");
        let config = ClusterConfig::from_deployment(schema, &slurm, &oracle).unwrap();
        assert_eq!(cluster_value(&config, "initial_queue_size"), &ParamValue::Int(7));
        assert_eq!(cluster_value(&config, "desired_vcpus"), &ParamValue::Int(2));
    }

    #[test]
    fn only_live_parameters_are_encoded() {
        let oracle = StaticOracle::new();
        let schema = Schema::global();
        let config = from_text(
            schema,
            "[cluster default]\n\
             scheduler = awsbatch\n\
             min_vcpus = 1\n\
             desired_vcpus = 4\n\
             max_vcpus = 16\n\
             spot_bid_percentage = 60\n\
             initial_queue_size = 3\n",
            &oracle,
        );

        let cfn = config.to_cfn(&oracle).unwrap();
        assert_eq!(cfn.get("MinSize"), "1");
        assert_eq!(cfn.get("DesiredSize"), "4");
        assert_eq!(cfn.get("MaxSize"), "16");
        assert_eq!(cfn.get("SpotPrice"), "60");
    }

    #[test]
    fn floor_carries_the_initial_size_for_traditional_schedulers() {
        let oracle = StaticOracle::new();
        let schema = Schema::global();
        let config = from_text(
            schema,
            "[cluster default]\n\
             scheduler = slurm\n\
             initial_queue_size = 3\n\
             maintain_initial_size = true\n",
            &oracle,
        );

        let cfn = config.to_cfn(&oracle).unwrap();
        assert_eq!(cfn.get("MinSize"), "3");
        assert_eq!(cfn.get("DesiredSize"), "3");

        let decoded = ClusterConfig::from_deployment(schema, &cfn, &oracle).unwrap();
        assert_eq!(
            cluster_value(&decoded, "maintain_initial_size"),
            &ParamValue::Bool(true)
        );
        assert_eq!(cluster_value(&decoded, "min_vcpus"), &ParamValue::Int(0));

        let without = from_text(schema, "[cluster default]\ninitial_queue_size = 3\n", &oracle);
        assert_eq!(without.to_cfn(&oracle).unwrap().get("MinSize"), "0");
    }

    #[test]
    fn volumes_are_padded_to_the_maximum() {
        let oracle = StaticOracle::new();
        let schema = Schema::global();
        let config = from_text(
            schema,
            "[cluster default]\n\
             ebs_settings = vol2, vol1\n\
             \n\
             [ebs vol1]\n\
             shared_dir = /vol1\n\
             volume_size = 50\n\
             \n\
             [ebs vol2]\n\
             shared_dir = /vol2\n\
             encrypted = true\n",
            &oracle,
        );

        let cfn = config.to_cfn(&oracle).unwrap();
        assert_eq!(cfn.get("NumberOfEBSVol"), "2");
        assert_eq!(cfn.get("SharedDir"), "/vol1,/vol2,NONE,NONE,NONE");
        assert_eq!(cfn.get("VolumeSize"), "50,20,20,20,20");
        assert_eq!(cfn.get("EBSEncryption"), "false,true,false,false,false");
        assert_eq!(cfn.get("VolumeType"), "gp2,gp2,gp2,gp2,gp2");
        assert_eq!(cfn.get("EBSSnapshotId"), "NONE,NONE,NONE,NONE,NONE");

        let decoded = ClusterConfig::from_deployment(schema, &cfn, &oracle).unwrap();
        assert_eq!(
            cluster_value(&decoded, "ebs_settings"),
            &ParamValue::List(vec!["ebs1".to_owned(), "ebs2".to_owned()])
        );
        let first = decoded.section("ebs", "ebs1").unwrap();
        assert_eq!(first.value("shared_dir"), Some(&ParamValue::string("/vol1")));
        assert_eq!(first.value("volume_size"), Some(&ParamValue::Int(50)));
        let second = decoded.section("ebs", "ebs2").unwrap();
        assert_eq!(second.value("encrypted"), Some(&ParamValue::Bool(true)));
        // the shared slot belongs to the volumes, the cluster keeps its default
        assert_eq!(cluster_value(&decoded, "shared_dir"), &ParamValue::string("/shared"));
    }

    #[test]
    fn default_volume_slots_do_not_materialize_sections() {
        let oracle = StaticOracle::new();
        let cfn = CfnParams::new()
            .with("NumberOfEBSVol", "2")
            .with("SharedDir", "/data,NONE,NONE,NONE,NONE")
            .with("VolumeSize", "20,20,20,20,20");
        let config = ClusterConfig::from_deployment(Schema::global(), &cfn, &oracle).unwrap();

        assert!(config.section("ebs", "ebs1").is_some());
        assert!(config.section("ebs", "ebs2").is_none());
        assert_eq!(
            cluster_value(&config, "ebs_settings"),
            &ParamValue::List(vec!["ebs1".to_owned()])
        );
    }

    #[test]
    fn single_shared_dir_slot_belongs_to_the_cluster() {
        let oracle = StaticOracle::new();
        let cfn = CfnParams::new()
            .with("NumberOfEBSVol", "1")
            .with("SharedDir", "/data");
        let config = ClusterConfig::from_deployment(Schema::global(), &cfn, &oracle).unwrap();

        assert_eq!(cluster_value(&config, "shared_dir"), &ParamValue::string("/data"));
        assert!(!config.has_sections("ebs"));

        let document = config.to_file();
        assert_eq!(document.get("cluster default", "shared_dir"), Some("/data"));
    }

    #[test]
    fn volume_file_form_lists_labels_in_order() {
        let oracle = StaticOracle::new();
        let config = from_text(
            Schema::global(),
            "[cluster default]\n\
             ebs_settings = b, a\n\
             shared_dir = /ignored\n\
             \n\
             [ebs a]\n\
             shared_dir = /a\n\
             \n\
             [ebs b]\n\
             volume_size = 30\n",
            &oracle,
        );

        assert_eq!(
            config.to_file().render(),
            "[cluster default]\n\
             ebs_settings = b,a\n\
             \n\
             [ebs a]\n\
             shared_dir = /a\n\
             \n\
             [ebs b]\n\
             volume_size = 30\n"
        );
    }

    #[test]
    fn too_many_volumes_are_rejected() {
        let oracle = StaticOracle::new();
        let document = IniDocument::parse("[cluster default]\nebs_settings = a,b,c,d,e,f\n").unwrap();
        let err = ClusterConfig::from_file(
            Schema::global(),
            &document,
            &BuildOptions::default(),
            &oracle,
        )
        .unwrap_err();
        assert!(err.to_string().contains("up to 5 ebs section labels"));
    }

    #[test]
    fn empty_and_repeated_volume_labels_are_rejected() {
        let oracle = StaticOracle::new();
        let load = |labels: &str| {
            let document = IniDocument::parse(&format!(
                "[cluster default]\nebs_settings = {labels}\n\n[ebs a]\nshared_dir = /a\n\n[ebs b]\nshared_dir = /b\n"
            ))
            .unwrap();
            ClusterConfig::from_file(Schema::global(), &document, &BuildOptions::default(), &oracle)
        };

        for labels in ["a,,b", ",", "a,"] {
            let err = load(labels).unwrap_err();
            assert_eq!(err.exit_code(), 1);
            assert!(err.to_string().contains("empty ebs section label"), "{labels}");
        }

        let err = load("a, b, a").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("The ebs section label 'a' is repeated"));

        let config = load("a, b").unwrap();
        assert_eq!(
            cluster_value(&config, "ebs_settings"),
            &ParamValue::List(vec!["a".to_owned(), "b".to_owned()])
        );
    }

    #[test]
    fn sparse_write_skips_default_sections() {
        let oracle = StaticOracle::new();
        let schema = Schema::global();
        let config = from_text(
            schema,
            "[cluster default]\n\
             key_name = mykey\n\
             efs_settings = custom\n\
             \n\
             [efs custom]\n\
             performance_mode = generalPurpose\n",
            &oracle,
        );

        assert!(config.section("efs", "custom").is_some());
        assert_eq!(
            config.to_file().render(),
            "[cluster default]\nkey_name = mykey\n"
        );

        let blank = Section::blank(schema.section("efs").unwrap(), "other");
        let mut document = IniDocument::new();
        blank.to_file(&config, &mut document);
        assert_eq!(document.render(), "");
    }

    #[test]
    fn settings_default_label_materializes_the_section() {
        let oracle = StaticOracle::new();
        let config = from_text(Schema::global(), "[cluster default]\nkey_name = k\n", &oracle);

        let scaling = config.section("scaling", "default").unwrap();
        assert_eq!(scaling.value("scaledown_idletime"), Some(&ParamValue::Int(10)));
        assert!(!config.has_sections("vpc"));
        assert_eq!(cluster_value(&config, "vpc_settings"), &ParamValue::None);
    }

    #[test]
    fn missing_referred_block_is_fatal() {
        let oracle = StaticOracle::new();
        let document = IniDocument::parse("[cluster default]\nvpc_settings = public\n").unwrap();
        let err = ClusterConfig::from_file(
            Schema::global(),
            &document,
            &BuildOptions::default(),
            &oracle,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Section '[vpc public]' not found in the config file.");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn settings_accept_a_single_label() {
        let oracle = StaticOracle::new();
        let document = IniDocument::parse(
            "[cluster default]\nvpc_settings = a, b\n\n[vpc a]\n\n[vpc b]\n",
        )
        .unwrap();
        let err = ClusterConfig::from_file(
            Schema::global(),
            &document,
            &BuildOptions::default(),
            &oracle,
        )
        .unwrap_err();
        assert!(err.to_string().contains("single vpc section label"));
    }

    #[test]
    fn disallowed_values_name_key_and_pattern() {
        let oracle = StaticOracle::new();
        let document = IniDocument::parse(
            "[cluster default]\nvpc_settings = public\n\n[vpc public]\nadditional_sg = sg-bad\n",
        )
        .unwrap();
        let err = ClusterConfig::from_file(
            Schema::global(),
            &document,
            &BuildOptions::default(),
            &oracle,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The configuration parameter 'additional_sg' has an invalid value 'sg-bad'\n\
             Allowed values are: ^sg-[0-9a-z]{8}$|^sg-[0-9a-z]{17}$"
        );

        let config = from_text(
            Schema::global(),
            "[cluster default]\nvpc_settings = public\n\n[vpc public]\nadditional_sg = sg-12345678\n",
            &oracle,
        );
        assert_eq!(
            config.section("vpc", "public").unwrap().value("additional_sg"),
            Some(&ParamValue::string("sg-12345678"))
        );
    }

    #[test]
    fn undeclared_keys_are_listed_at_once() {
        let oracle = StaticOracle::new();
        let schema = Schema::global();

        let single = IniDocument::parse("[cluster default]\nkey_nam = typo\n").unwrap();
        let err = ClusterConfig::from_file(schema, &single, &BuildOptions::default(), &oracle)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The configuration parameter 'key_nam' is not allowed in the [cluster default] section"
        );

        let several = IniDocument::parse(
            "[cluster default]\nvpc_settings = public\n\n[vpc public]\nvpc_id = vpc-1\nfoo = 1\nbar = 2\n",
        )
        .unwrap();
        let err = ClusterConfig::from_file(schema, &several, &BuildOptions::default(), &oracle)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The configuration parameters 'foo,bar' are not allowed in the [vpc public] section"
        );
    }

    #[test]
    fn availability_zone_is_derived_and_never_written() {
        let oracle = StaticOracle::new()
            .with_availability_zone("subnet-12345678", "us-east-1a")
            .with_mount_target("fs-12345678", "us-east-1a", "fsmt-1");
        let config = from_text(
            Schema::global(),
            "[cluster default]\n\
             vpc_settings = public\n\
             efs_settings = shared\n\
             \n\
             [vpc public]\n\
             vpc_id = vpc-12345678\n\
             master_subnet_id = subnet-12345678\n\
             \n\
             [efs shared]\n\
             shared_dir = /efs\n\
             efs_fs_id = fs-12345678\n",
            &oracle,
        );

        assert_eq!(config.master_availability_zone(), Some("us-east-1a"));

        let cfn = config.to_cfn(&oracle).unwrap();
        assert_eq!(cfn.get("AvailabilityZone"), "us-east-1a");
        assert_eq!(cfn.get("MasterSubnetId"), "subnet-12345678");
        assert_eq!(
            cfn.get("EFSOptions"),
            "/efs,fs-12345678,generalPurpose,NONE,NONE,false,bursting,Valid"
        );

        let rendered = config.to_file().render();
        assert!(!rendered.contains("master_availability_zone"));
        assert!(rendered.contains("[vpc public]\nvpc_id = vpc-12345678\nmaster_subnet_id = subnet-12345678\n"));

        let decoded = ClusterConfig::from_deployment(Schema::global(), &cfn, &oracle).unwrap();
        assert_eq!(decoded.master_availability_zone(), Some("us-east-1a"));
        let efs = decoded.section("efs", "default").unwrap();
        assert_eq!(efs.value("efs_fs_id"), Some(&ParamValue::string("fs-12345678")));
    }

    #[test]
    fn mount_target_flag_needs_a_target_in_the_master_zone() {
        let oracle = StaticOracle::new()
            .with_availability_zone("subnet-12345678", "us-east-1b")
            .with_mount_target("fs-12345678", "us-east-1a", "fsmt-1");
        let config = from_text(
            Schema::global(),
            "[cluster default]\n\
             vpc_settings = public\n\
             efs_settings = shared\n\
             \n\
             [vpc public]\n\
             master_subnet_id = subnet-12345678\n\
             \n\
             [efs shared]\n\
             shared_dir = /efs\n\
             efs_fs_id = fs-12345678\n",
            &oracle,
        );
        let cfn = config.to_cfn(&oracle).unwrap();
        assert!(cfn.get("EFSOptions").ends_with(",NONE"));
    }

    #[test]
    fn unknown_subnet_is_a_lookup_error() {
        let oracle = StaticOracle::new();
        let document = IniDocument::parse(
            "[cluster default]\nvpc_settings = public\n\n[vpc public]\nmaster_subnet_id = subnet-0\n",
        )
        .unwrap();
        let err = ClusterConfig::from_file(
            Schema::global(),
            &document,
            &BuildOptions::default(),
            &oracle,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn flattened_sections_collapse_without_their_first_item() {
        let oracle = StaticOracle::new();
        let config = from_text(
            Schema::global(),
            "[cluster default]\n\
             raid_settings = r\n\
             \n\
             [raid r]\n\
             raid_type = 1\n\
             num_of_raid_volumes = 3\n",
            &oracle,
        );
        let cfn = config.to_cfn(&oracle).unwrap();
        assert_eq!(cfn.get("RAIDOptions"), "NONE,NONE,NONE,NONE,NONE,NONE,NONE,NONE");

        let config = from_text(
            Schema::global(),
            "[cluster default]\n\
             raid_settings = r\n\
             \n\
             [raid r]\n\
             shared_dir = /raid\n\
             raid_type = 1\n\
             num_of_raid_volumes = 3\n",
            &oracle,
        );
        let cfn = config.to_cfn(&oracle).unwrap();
        assert_eq!(cfn.get("RAIDOptions"), "/raid,1,3,gp2,20,100,false,NONE");
    }

    #[test]
    fn cluster_label_travels_with_the_deployment_form() {
        let oracle = StaticOracle::new();
        let schema = Schema::global();
        let document = IniDocument::parse(
            "[global]\ncluster_template = prod\n\n[cluster prod]\nkey_name = ops\n",
        )
        .unwrap();
        let config = ClusterConfig::from_file(schema, &document, &BuildOptions::default(), &oracle)
            .unwrap();
        assert_eq!(config.cluster_label(), "prod");

        let cfn = config.to_cfn(&oracle).unwrap();
        assert_eq!(cfn.get("CLITemplate"), "prod");
        assert_eq!(cfn.get("KeyName"), "ops");

        let decoded = ClusterConfig::from_deployment(schema, &cfn, &oracle).unwrap();
        assert_eq!(decoded.cluster_label(), "prod");
        assert_eq!(
            decoded.to_file().render(),
            "[global]\ncluster_template = prod\n\n[cluster prod]\nkey_name = ops\n"
        );
    }

    #[test]
    fn json_and_list_parameters() {
        let oracle = StaticOracle::new();
        let config = from_text(
            Schema::global(),
            "[cluster default]\n\
             extra_json = {\"cluster\": {\"cfn_scheduler_slots\": \"cores\"}}\n\
             additional_iam_policies = arn:aws:iam::aws:policy/A, arn:aws:iam::aws:policy/B\n",
            &oracle,
        );
        let cfn = config.to_cfn(&oracle).unwrap();
        assert_eq!(
            cfn.get("ExtraJson"),
            "{\"cluster\":{\"cfn_scheduler_slots\":\"cores\"}}"
        );
        assert_eq!(
            cfn.get("EC2IAMPolicies"),
            "arn:aws:iam::aws:policy/A,arn:aws:iam::aws:policy/B"
        );

        let bad = IniDocument::parse("[cluster default]\nextra_json = {\"a\": \n").unwrap();
        let err = ClusterConfig::from_file(
            Schema::global(),
            &bad,
            &BuildOptions::default(),
            &oracle,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Error parsing JSON parameter 'extra_json'."));
    }

    #[test]
    fn empty_json_objects_are_the_default() {
        let oracle = StaticOracle::new();
        let config = from_text(
            Schema::global(),
            "[cluster default]\nextra_json = {}\ntags = {}\nkey_name = ops\n",
            &oracle,
        );
        let empty = ParamValue::Json(serde_json::json!({}));
        assert_eq!(cluster_value(&config, "extra_json"), &empty);
        assert_eq!(cluster_value(&config, "tags"), &empty);

        let rendered = config.to_file().render();
        assert!(rendered.contains("key_name = ops\n"));
        assert!(!rendered.contains("extra_json"));
        assert!(!rendered.contains("tags"));

        let cfn = config.to_cfn(&oracle).unwrap();
        assert_eq!(cfn.get("ExtraJson"), "{}");
        let decoded = ClusterConfig::from_deployment(Schema::global(), &cfn, &oracle).unwrap();
        assert_eq!(cluster_value(&decoded, "extra_json"), &empty);
    }
}
