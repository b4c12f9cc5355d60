//! Section and parameter declarations of the cluster configuration
//!
//! Declaration order inside a section is part of the deployment wire format:
//! flattened sections are joined positionally in this order.

use super::conditional::{CEILING, FLOOR, INITIAL_SIZE, PRICE};
use super::{AllowedValues, ParamKind, ParamSchema, SectionSchema};
use crate::param::value::{ParamValue, ScalarKind};
use crate::validation::validators;

/// Top-level section kinds, in file order
pub const MAIN_SECTIONS: &[&str] = &["aws", "global", "aliases", "cluster"];

/// Upper bound of `ebs` sections a cluster can refer to
pub const MAX_EBS_VOLUMES: usize = 5;

const SECURITY_GROUP: AllowedValues = AllowedValues::Pattern("^sg-[0-9a-z]{8}$|^sg-[0-9a-z]{17}$");

/// All section declarations
#[must_use]
pub fn sections() -> Vec<SectionSchema> {
    vec![
        aws(),
        global(),
        aliases(),
        scaling(),
        vpc(),
        ebs(),
        efs(),
        raid(),
        fsx(),
        cluster(),
    ]
}

fn aws() -> SectionSchema {
    SectionSchema::new(
        "aws",
        vec![
            ParamSchema::string("aws_access_key_id"),
            ParamSchema::string("aws_secret_access_key"),
            ParamSchema::string("aws_region_name").default_str("us-east-1"),
        ],
    )
}

fn global() -> SectionSchema {
    SectionSchema::new(
        "global",
        vec![
            ParamSchema::string("cluster_template").default_str("default"),
            ParamSchema::boolean("update_check").default_bool(true),
            ParamSchema::boolean("sanity_check").default_bool(true),
        ],
    )
}

fn aliases() -> SectionSchema {
    SectionSchema::new(
        "aliases",
        vec![ParamSchema::string("ssh").default_str("ssh {CFN_USER}@{MASTER_IP} {ARGS}")],
    )
}

fn scaling() -> SectionSchema {
    SectionSchema::new(
        "scaling",
        vec![
            ParamSchema::int("scaledown_idletime")
                .default_int(10)
                .cfn("ScaleDownIdleTime"),
        ],
    )
    .label("default")
}

fn vpc() -> SectionSchema {
    SectionSchema::new(
        "vpc",
        vec![
            ParamSchema::string("vpc_id").cfn("VPCId"),
            ParamSchema::string("master_subnet_id").cfn("MasterSubnetId"),
            ParamSchema::string("ssh_from")
                .default_str("0.0.0.0/0")
                .cfn("AccessFrom"),
            ParamSchema::string("additional_sg")
                .cfn("AdditionalSG")
                .allowed(SECURITY_GROUP),
            ParamSchema::string("compute_subnet_id").cfn("ComputeSubnetId"),
            ParamSchema::string("compute_subnet_cidr").cfn("ComputeSubnetCidr"),
            ParamSchema::boolean("use_public_ips")
                .default_bool(true)
                .cfn("UsePublicIps"),
            ParamSchema::string("vpc_security_group_id")
                .cfn("VPCSecurityGroupId")
                .allowed(SECURITY_GROUP),
            ParamSchema::new(
                "master_availability_zone",
                ParamKind::AvailabilityZone {
                    subnet_param: "master_subnet_id",
                },
            )
            .cfn("AvailabilityZone"),
        ],
    )
    .label("default")
}

fn ebs() -> SectionSchema {
    SectionSchema::new(
        "ebs",
        vec![
            ParamSchema::string("shared_dir").cfn("SharedDir"),
            ParamSchema::string("ebs_snapshot_id").cfn("EBSSnapshotId"),
            ParamSchema::string("volume_type")
                .default_str("gp2")
                .cfn("VolumeType"),
            ParamSchema::int("volume_size")
                .default_int(20)
                .cfn("VolumeSize"),
            ParamSchema::int("volume_iops")
                .default_int(100)
                .cfn("VolumeIOPS"),
            ParamSchema::boolean("encrypted")
                .default_bool(false)
                .cfn("EBSEncryption"),
            ParamSchema::string("ebs_kms_key_id").cfn("EBSKMSKeyId"),
            ParamSchema::string("ebs_volume_id").cfn("EBSVolumeId"),
        ],
    )
    .label("default")
}

fn efs() -> SectionSchema {
    SectionSchema::new(
        "efs",
        vec![
            ParamSchema::string("shared_dir"),
            ParamSchema::string("efs_fs_id").validator(validators::efs_id),
            ParamSchema::string("performance_mode")
                .default_str("generalPurpose")
                .allowed(AllowedValues::OneOf(&["generalPurpose", "maxIO"])),
            ParamSchema::string("efs_kms_key_id"),
            ParamSchema::int("provisioned_throughput")
                .allowed(AllowedValues::Pattern(r"^[0-9]{1,4}(\.[0-9])?$")),
            ParamSchema::boolean("encrypted").default_bool(false),
            ParamSchema::string("throughput_mode")
                .default_str("bursting")
                .allowed(AllowedValues::OneOf(&["provisioned", "bursting"])),
        ],
    )
    .label("default")
    .cfn("EFSOptions")
    .mount_target_param("efs_fs_id")
    .validator(validators::efs)
}

fn empty_json() -> ParamValue {
    ParamValue::Json(serde_json::Value::Object(serde_json::Map::new()))
}

fn raid() -> SectionSchema {
    SectionSchema::new(
        "raid",
        vec![
            ParamSchema::string("shared_dir"),
            ParamSchema::int("raid_type").allowed(AllowedValues::OneOf(&["0", "1"])),
            ParamSchema::int("num_of_raid_volumes").allowed(AllowedValues::Pattern("^[1-5]$")),
            ParamSchema::string("volume_type").default_str("gp2"),
            ParamSchema::int("volume_size").default_int(20),
            ParamSchema::int("volume_iops")
                .default_int(100)
                .validator(validators::raid_volume_iops),
            ParamSchema::boolean("encrypted").default_bool(false),
            ParamSchema::string("ebs_kms_key_id"),
        ],
    )
    .label("default")
    .cfn("RAIDOptions")
}

fn fsx() -> SectionSchema {
    SectionSchema::new(
        "fsx",
        vec![
            ParamSchema::string("shared_dir"),
            ParamSchema::string("fsx_fs_id"),
            ParamSchema::int("storage_capacity").validator(validators::fsx_storage_capacity),
            ParamSchema::string("fsx_kms_key_id"),
            ParamSchema::int("imported_file_chunk_size")
                .validator(validators::fsx_imported_file_chunk_size),
            ParamSchema::string("export_path"),
            ParamSchema::string("import_path"),
            ParamSchema::string("weekly_maintenance_start_time"),
        ],
    )
    .label("default")
    .cfn("FSXOptions")
    .validator(validators::fsx)
}

fn cluster() -> SectionSchema {
    SectionSchema::new(
        "cluster",
        vec![
            // Basic configuration
            ParamSchema::string("key_name").cfn("KeyName"),
            ParamSchema::string("template_url").validator(validators::url),
            ParamSchema::string("base_os")
                .default_str("alinux")
                .cfn("BaseOS")
                .allowed(AllowedValues::OneOf(&[
                    "alinux",
                    "ubuntu1404",
                    "ubuntu1604",
                    "centos6",
                    "centos7",
                ])),
            ParamSchema::string("scheduler")
                .default_str("sge")
                .cfn("Scheduler")
                .allowed(AllowedValues::OneOf(&["awsbatch", "sge", "slurm", "torque"]))
                .validator(validators::scheduler),
            ParamSchema::string("shared_dir")
                .default_str("/shared")
                .cfn("SharedDir")
                .defer_to("ebs"),
            // Cluster configuration
            ParamSchema::string("placement_group").cfn("PlacementGroup"),
            ParamSchema::string("placement")
                .default_str("compute")
                .cfn("Placement")
                .allowed(AllowedValues::OneOf(&["cluster", "compute"])),
            // Master
            ParamSchema::string("master_instance_type")
                .default_str("t2.micro")
                .cfn("MasterInstanceType"),
            ParamSchema::int("master_root_volume_size")
                .default_int(17)
                .cfn("MasterRootVolumeSize"),
            // Compute fleet
            ParamSchema::string("compute_instance_type")
                .default_str("t2.micro")
                .cfn("ComputeInstanceType"),
            ParamSchema::int("compute_root_volume_size")
                .default_int(17)
                .cfn("ComputeRootVolumeSize"),
            ParamSchema::conditional("initial_queue_size", ScalarKind::Int, &INITIAL_SIZE)
                .default_int(0),
            ParamSchema::conditional("max_queue_size", ScalarKind::Int, &CEILING).default_int(10),
            ParamSchema::conditional("maintain_initial_size", ScalarKind::Bool, &FLOOR)
                .default_bool(false),
            ParamSchema::conditional("min_vcpus", ScalarKind::Int, &FLOOR).default_int(0),
            ParamSchema::conditional("desired_vcpus", ScalarKind::Int, &INITIAL_SIZE)
                .default_int(2),
            ParamSchema::conditional("max_vcpus", ScalarKind::Int, &CEILING).default_int(10),
            ParamSchema::string("cluster_type")
                .default_str("ondemand")
                .cfn("ClusterType")
                .allowed(AllowedValues::OneOf(&["ondemand", "spot"])),
            ParamSchema::conditional("spot_price", ScalarKind::Float, &PRICE)
                .with_default(ParamValue::Float(10.0))
                .allowed(AllowedValues::Pattern(r"^[0-9]+(\.[0-9]+)?$")),
            ParamSchema::conditional("spot_bid_percentage", ScalarKind::Int, &PRICE)
                .default_int(0)
                .allowed(AllowedValues::Pattern("^([0-9]|[1-9][0-9]|100)$")),
            // Access and networking
            ParamSchema::string("proxy_server").cfn("ProxyServer"),
            ParamSchema::string("ec2_iam_role").cfn("EC2IAMRoleName"),
            ParamSchema::string("s3_read_resource").cfn("S3ReadResource"),
            ParamSchema::string("s3_read_write_resource").cfn("S3ReadWriteResource"),
            // Customization
            ParamSchema::string("enable_efa")
                .cfn("EFA")
                .allowed(AllowedValues::OneOf(&["compute"]))
                .validator(validators::efa),
            ParamSchema::string("ephemeral_dir")
                .default_str("/scratch")
                .cfn("EphemeralDir"),
            ParamSchema::boolean("encrypted_ephemeral")
                .default_bool(false)
                .cfn("EncryptedEphemeral"),
            ParamSchema::string("custom_ami").cfn("CustomAMI"),
            ParamSchema::string("pre_install")
                .cfn("PreInstallScript")
                .validator(validators::url),
            ParamSchema::string("pre_install_args").cfn("PreInstallArgs"),
            ParamSchema::string("post_install")
                .cfn("PostInstallScript")
                .validator(validators::url),
            ParamSchema::string("post_install_args").cfn("PostInstallArgs"),
            ParamSchema::json("extra_json")
                .with_default(empty_json())
                .cfn("ExtraJson"),
            ParamSchema::string("additional_cfn_template")
                .cfn("AdditionalCfnTemplate")
                .validator(validators::url),
            ParamSchema::json("tags").with_default(empty_json()),
            ParamSchema::list("additional_iam_policies").cfn("EC2IAMPolicies"),
            ParamSchema::string("custom_chef_cookbook").cfn("CustomChefCookbook"),
            ParamSchema::string("custom_awsbatch_template_url")
                .cfn("CustomAWSBatchTemplateURL")
                .validator(validators::url),
            // Settings
            ParamSchema::settings("scaling_settings", "scaling").default_str("default"),
            ParamSchema::settings("vpc_settings", "vpc"),
            ParamSchema::new(
                "ebs_settings",
                ParamKind::MultiSettings {
                    section: "ebs",
                    max: MAX_EBS_VOLUMES,
                    count_slot: "NumberOfEBSVol",
                },
            ),
            ParamSchema::settings("efs_settings", "efs"),
            ParamSchema::settings("raid_settings", "raid"),
            ParamSchema::settings("fsx_settings", "fsx"),
        ],
    )
    .label("default")
    .label_slot("CLITemplate")
    .validator(validators::cluster)
}
