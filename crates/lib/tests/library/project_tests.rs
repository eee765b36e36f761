use snapforge_lib::ConfigError;
use snapforge_lib::Project;
use snapforge_lib::plugin::PluginRegistry;

use super::common::TestProject;

#[test]
fn loads_parts_with_resolved_options() {
  let project = TestProject::new(
    r#"
name: kernel-snap
parts:
  kernel:
    plugin: kernel
    options:
      source: linux
      kconfigs: [CONFIG_EXT4_FS=y]
      kernel-initrd-modules: [squashfs]
  firmware:
    plugin: dump
    options:
      source: firmware
"#,
  )
  .load();

  assert_eq!(project.name(), Some("kernel-snap"));
  let kernel = project.part("kernel").unwrap();
  assert_eq!(kernel.plugin().name(), "kernel");
  assert_eq!(kernel.options().str("kdefconfig"), Some("defconfig"));
  assert_eq!(kernel.options().str("kernel-image-target"), Some("bzImage"));
  assert_eq!(kernel.options().str("kernel-initrd-compression"), Some("gz"));
  assert_eq!(kernel.options().strings("kconfigs"), vec!["CONFIG_EXT4_FS=y"]);
  assert_eq!(kernel.build_packages(), vec!["make", "kmod", "cpio"]);
}

#[test]
fn unknown_plugin_names_part() {
  let err = Project::load(TestProject::new("parts:\n  web:\n    plugin: autotools\n").temp.path()).unwrap_err();
  assert!(matches!(err, ConfigError::UnknownPlugin { ref part, ref plugin } if part == "web" && plugin == "autotools"));
}

#[test]
fn unknown_option_names_part_and_option() {
  let yaml = "parts:\n  app:\n    plugin: maven\n    options:\n      maven-flags: [-q]\n";
  let err = Project::load(TestProject::new(yaml).temp.path()).unwrap_err();
  assert_eq!(err.to_string(), "part 'app': unknown option 'maven-flags'");
}

#[test]
fn invalid_enum_value_is_rejected() {
  let yaml = "parts:\n  k:\n    plugin: kernel\n    options:\n      kernel-initrd-compression: lz4\n";
  let err = Project::load(TestProject::new(yaml).temp.path()).unwrap_err();
  assert!(matches!(err, ConfigError::NotAllowed { ref option, .. } if option == "kernel-initrd-compression"));
}

#[test]
fn wrong_type_is_rejected() {
  let yaml = "parts:\n  k:\n    plugin: kbuild\n    options:\n      kconfigs: CONFIG_X=y\n";
  let err = Project::load(TestProject::new(yaml).temp.path()).unwrap_err();
  assert!(matches!(err, ConfigError::InvalidType { ref option, .. } if option == "kconfigs"));
}

#[test]
fn tar_plugin_requires_source() {
  let err = Project::load(TestProject::new("parts:\n  t:\n    plugin: tar\n").temp.path()).unwrap_err();
  assert!(matches!(err, ConfigError::MissingOption { ref option, .. } if option == "source"));
}

#[test]
fn malformed_yaml_is_parse_error() {
  let err = Project::load(TestProject::new("parts: [unterminated").temp.path()).unwrap_err();
  assert!(matches!(err, ConfigError::ParseProject { .. }));
}

#[test]
fn custom_registry_without_builtins() {
  let test = TestProject::new("parts:\n  a:\n    plugin: nil\n");
  let err = Project::load_with(test.temp.path(), &PluginRegistry::new()).unwrap_err();
  assert!(matches!(err, ConfigError::UnknownPlugin { .. }));
}
