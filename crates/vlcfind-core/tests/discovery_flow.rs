mod common;

use std::sync::atomic::Ordering;

use common::{plugin_value, CountingProvider, FakeBinding, FakeRule, MemoryEnv, TempTree};
use vlcfind_core::discovery::AttemptOutcome;
use vlcfind_core::{
    DiscoveryPhase, DirectoryScanner, NativeDiscovery, PlatformRule, Priority, ProviderRegistry,
    ScanMode, StaticProvider, Version, LIBVLCCORE_NAME, LIBVLC_NAME, PLUGIN_ENV_NAME,
};

fn min_version() -> Version {
    Version::parse("3.0.0").unwrap()
}

fn discovery(
    providers: ProviderRegistry,
    binding: &FakeBinding,
    env: &MemoryEnv,
) -> NativeDiscovery {
    NativeDiscovery::new(
        vec![Box::new(FakeRule::new())],
        providers,
        binding.clone(),
        env.clone(),
        min_version(),
    )
}

#[test]
fn higher_priority_provider_is_tried_first() {
    let tree = TempTree::new("vlcfind-priority");
    let low = tree.install("low");
    let high = tree.install("high");

    let binding = FakeBinding::default();
    binding.script(&low, Ok("3.0.18"));
    binding.script(&high, Ok("3.0.20 Vetinari"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers
        .register(StaticProvider::new("Low", Priority::Low, vec![low.clone()]))
        .register(StaticProvider::new("High", Priority::High, vec![high.clone()]));

    let mut nd = discovery(providers, &binding, &env);
    assert!(nd.discover());
    assert_eq!(nd.discovered_path(), Some(high.as_path()));
    assert_eq!(binding.probes(), vec![high.clone()]);
    assert_eq!(
        nd.state().native_version().map(|v| v.revision()),
        Some(20)
    );
    assert_eq!(
        env.get(PLUGIN_ENV_NAME),
        Some(plugin_value(&high.join("plugins")))
    );
}

#[test]
fn two_provider_scenario_skips_empty_directory() {
    let tree = TempTree::new("vlcfind-scenario");
    let empty = tree.dir("a");
    let installed = tree.install("b");

    let binding = FakeBinding::default();
    binding.script(&installed, Ok("3.0.20"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers
        .register(StaticProvider::new("A", Priority::High, vec![empty]))
        .register(StaticProvider::new("B", Priority::Normal, vec![installed.clone()]));

    let mut nd = discovery(providers, &binding, &env);
    assert_eq!(nd.phase(), DiscoveryPhase::NotStarted);
    assert!(nd.discover());
    assert_eq!(nd.phase(), DiscoveryPhase::Committed);
    assert_eq!(nd.discovered_path(), Some(installed.as_path()));
    assert_eq!(nd.active_rule().map(|r| r.name()), Some("FakeRule"));
    assert_eq!(binding.search_paths(LIBVLC_NAME), vec![installed.clone()]);

    // 空目录不构成候选，不应留下尝试记录
    let attempts = nd.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].provider, "B");
    assert!(matches!(attempts[0].outcome, AttemptOutcome::Committed { .. }));

    let report = nd.report();
    assert!(report.discovered);
    assert_eq!(report.rule.as_deref(), Some("FakeRule"));
    assert_eq!(report.native_version.as_deref(), Some("3.0.20"));
}

#[test]
fn preset_plugin_env_is_left_untouched() {
    let tree = TempTree::new("vlcfind-preset");
    // 没有 plugins/ 子目录：只有预设的环境变量能让它通过
    tree.touch("vlc/libfake.so");
    tree.touch("vlc/libfakecore.so");
    let dir = tree.0.join("vlc");

    let binding = FakeBinding::default();
    binding.script(&dir, Ok("3.0.0"));
    let env = MemoryEnv::with(PLUGIN_ENV_NAME, "/opt/custom/plugins");

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new("Only", Priority::Normal, vec![dir.clone()]));

    let mut nd = discovery(providers, &binding, &env);
    assert!(nd.discover());
    assert_eq!(env.set_calls(), 0);
    assert_eq!(env.get(PLUGIN_ENV_NAME).as_deref(), Some("/opt/custom/plugins"));
}

#[test]
fn missing_plugins_directory_moves_to_next_candidate() {
    let tree = TempTree::new("vlcfind-noplugins");
    tree.touch("bare/libfake.so");
    tree.touch("bare/libfakecore.so");
    let bare = tree.0.join("bare");
    let good = tree.install("good");

    let binding = FakeBinding::default();
    binding.script(&bare, Ok("3.0.20"));
    binding.script(&good, Ok("3.0.20"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new(
        "Both",
        Priority::Normal,
        vec![bare.clone(), good.clone()],
    ));

    let mut nd = discovery(providers, &binding, &env);
    assert!(nd.discover());
    assert_eq!(nd.discovered_path(), Some(good.as_path()));
    // 软失败的目录不做验证探测
    assert_eq!(binding.probes(), vec![good.clone()]);
    assert_eq!(nd.attempts()[0].outcome, AttemptOutcome::PluginPathMissing);
    assert_eq!(binding.search_paths(LIBVLC_NAME), vec![good]);
}

#[test]
fn failed_verification_rolls_back_and_continues() {
    let tree = TempTree::new("vlcfind-rollback");
    let old = tree.install("old");
    let broken = tree.install("broken");
    let good = tree.install("good");

    let binding = FakeBinding::default();
    binding.script(&old, Ok("2.2.8"));
    binding.script(&broken, Err("libvlc_new returned null"));
    binding.script(&good, Ok("3.0.21"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new(
        "Chain",
        Priority::Normal,
        vec![old.clone(), broken.clone(), good.clone()],
    ));

    let mut nd = discovery(providers, &binding, &env);
    assert!(nd.discover());
    assert_eq!(nd.discovered_path(), Some(good.as_path()));
    assert_eq!(binding.probes(), vec![old, broken, good.clone()]);

    // 每次回滚都清除两个库名
    let cleared = binding.cleared();
    assert_eq!(cleared.iter().filter(|n| *n == LIBVLC_NAME).count(), 2);
    assert_eq!(cleared.iter().filter(|n| *n == LIBVLCCORE_NAME).count(), 2);

    // 失败候选的搜索路径不残留
    assert_eq!(binding.search_paths(LIBVLC_NAME), vec![good.clone()]);
    assert_eq!(
        env.get(PLUGIN_ENV_NAME),
        Some(plugin_value(&good.join("plugins")))
    );

    let outcomes: Vec<_> = nd.attempts().iter().map(|a| &a.outcome).collect();
    assert!(matches!(outcomes[0], AttemptOutcome::VerifyFailed { reason } if reason.contains("2.2.8")));
    assert!(matches!(outcomes[1], AttemptOutcome::VerifyFailed { .. }));
    assert!(matches!(outcomes[2], AttemptOutcome::Committed { .. }));
}

#[test]
fn malformed_native_version_is_a_verification_failure() {
    let tree = TempTree::new("vlcfind-badversion");
    let dir = tree.install("vlc");

    let binding = FakeBinding::default();
    binding.script(&dir, Ok("unknown"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new("Only", Priority::Normal, vec![dir]));

    let mut nd = discovery(providers, &binding, &env);
    assert!(!nd.discover());
    assert_eq!(nd.phase(), DiscoveryPhase::Exhausted);
    assert!(nd.discovered_path().is_none());
    // 回滚后插件目录变量恢复为未设置
    assert_eq!(env.get(PLUGIN_ENV_NAME), None);
}

#[test]
fn rollback_restores_previous_plugin_env_value() {
    let tree = TempTree::new("vlcfind-restore");
    let dir = tree.install("vlc");

    let binding = FakeBinding::default();
    binding.script(&dir, Ok("1.1.0"));
    // 空值视为未设置，会被覆盖，失败后应恢复为空值
    let env = MemoryEnv::with(PLUGIN_ENV_NAME, "");

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new("Only", Priority::Normal, vec![dir]));

    let mut nd = discovery(providers, &binding, &env);
    assert!(!nd.discover());
    assert_eq!(env.get(PLUGIN_ENV_NAME).as_deref(), Some(""));
}

#[test]
fn committed_discovery_is_idempotent() {
    let tree = TempTree::new("vlcfind-idempotent");
    let dir = tree.install("vlc");

    let binding = FakeBinding::default();
    binding.script(&dir, Ok("3.0.20"));
    let env = MemoryEnv::default();

    let provider = CountingProvider::new("Counting", Priority::Normal, vec![dir.clone()]);
    let calls = provider.calls.clone();
    let mut providers = ProviderRegistry::new();
    providers.register(provider);

    let mut nd = discovery(providers, &binding, &env);
    assert!(nd.discover());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(nd.discover());
    assert!(nd.discover());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(binding.probes().len(), 1);
    assert_eq!(nd.discovered_path(), Some(dir.as_path()));
}

#[test]
fn exhaustion_is_not_cached() {
    let tree = TempTree::new("vlcfind-retry");
    let dir = tree.dir("later");

    let binding = FakeBinding::default();
    binding.script(&dir, Ok("3.0.20"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new("Later", Priority::Normal, vec![dir.clone()]));

    let mut nd = discovery(providers, &binding, &env);
    assert!(!nd.discover());
    assert_eq!(nd.phase(), DiscoveryPhase::Exhausted);
    assert!(nd.attempts().is_empty());

    // 用户随后安装了依赖
    tree.install("later");
    assert!(nd.discover());
    assert_eq!(nd.phase(), DiscoveryPhase::Committed);
    assert_eq!(nd.discovered_path(), Some(dir.as_path()));
}

#[test]
fn inapplicable_rules_are_never_scanned() {
    let tree = TempTree::new("vlcfind-inapplicable");
    let dir = tree.install("vlc");

    let binding = FakeBinding::default();
    binding.script(&dir, Ok("3.0.20"));
    let env = MemoryEnv::default();

    let provider = CountingProvider::new("Counting", Priority::Normal, vec![dir]);
    let calls = provider.calls.clone();
    let mut providers = ProviderRegistry::new();
    providers.register(provider);

    let rules: Vec<Box<dyn PlatformRule>> = vec![Box::new(FakeRule::inapplicable("OtherOs"))];
    let mut nd = NativeDiscovery::new(rules, providers, binding.clone(), env, min_version());
    assert!(!nd.discover());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(binding.probes().is_empty());
}

#[test]
fn recursive_mode_commits_matching_subdirectory() {
    let tree = TempTree::new("vlcfind-recursive");
    let nested = tree.install("root/vlc");
    let root = tree.0.join("root");
    let nested_abs = std::path::absolute(&nested).unwrap();

    let binding = FakeBinding::default();
    binding.script(&nested_abs, Ok("3.0.20"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new("Root", Priority::Normal, vec![root.clone()]));

    let mut flat = discovery(providers, &binding, &env);
    assert!(!flat.discover());

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new("Root", Priority::Normal, vec![root]));
    let mut nd = discovery(providers, &binding, &env)
        .with_scanner(DirectoryScanner::new(ScanMode::Recursive, 16));
    assert!(nd.discover());
    assert_eq!(nd.discovered_path(), Some(nested_abs.as_path()));
}

#[test]
fn custom_plugin_env_name_is_used() {
    let tree = TempTree::new("vlcfind-envname");
    let dir = tree.install("vlc");

    let binding = FakeBinding::default();
    binding.script(&dir, Ok("3.0.20"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new("Only", Priority::Normal, vec![dir.clone()]));

    let mut nd = discovery(providers, &binding, &env).with_plugin_env_name("MY_VLC_PLUGINS");
    assert!(nd.discover());
    assert_eq!(nd.plugin_env_name(), "MY_VLC_PLUGINS");
    assert_eq!(env.get(PLUGIN_ENV_NAME), None);
    assert_eq!(
        env.get("MY_VLC_PLUGINS"),
        Some(plugin_value(&dir.join("plugins")))
    );
}

#[test]
fn nested_plugin_directory_is_used_when_top_level_is_missing() {
    let tree = TempTree::new("vlcfind-nested-plugins");
    tree.touch("vlc/libfake.so");
    tree.touch("vlc/libfakecore.so");
    let nested = tree.dir("vlc/vlc/plugins");
    let dir = tree.0.join("vlc");

    let binding = FakeBinding::default();
    binding.script(&dir, Ok("3.0.20"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers.register(StaticProvider::new("Only", Priority::Normal, vec![dir]));

    let mut nd = discovery(providers, &binding, &env);
    assert!(nd.discover());
    assert_eq!(env.set_calls(), 1);
    assert_eq!(env.get(PLUGIN_ENV_NAME), Some(plugin_value(&nested)));
}

#[cfg(target_os = "linux")]
#[test]
fn linux_rule_end_to_end_with_two_providers() {
    use vlcfind_core::rule::LinuxRule;

    let tree = TempTree::new("vlcfind-linux-e2e");
    let opt = tree.dir("opt/fake-lib");
    let usr = tree.0.join("usr/lib/fake-lib");
    tree.touch("usr/lib/fake-lib/libvlc.so.5");
    tree.touch("usr/lib/fake-lib/libvlccore.so.9");
    tree.dir("usr/lib/fake-lib/plugins");
    tree.dir("usr/lib/fake-lib/vlc/plugins");

    let binding = FakeBinding::default();
    binding.script(&usr, Ok("3.0.20 Vetinari"));
    let env = MemoryEnv::default();

    let mut providers = ProviderRegistry::new();
    providers
        .register(StaticProvider::new("A", Priority::High, vec![opt]))
        .register(StaticProvider::new("B", Priority::Normal, vec![usr.clone()]));

    let mut nd = NativeDiscovery::new(
        vec![Box::new(LinuxRule::new())],
        providers,
        binding.clone(),
        env.clone(),
        min_version(),
    );
    assert!(nd.discover());
    assert_eq!(nd.discovered_path(), Some(usr.as_path()));
    assert_eq!(nd.active_rule().map(|r| r.name()), Some("LinuxRule"));
    assert_eq!(binding.search_paths(LIBVLC_NAME), vec![usr.clone()]);
    assert_eq!(env.get(PLUGIN_ENV_NAME), Some(plugin_value(&usr.join("plugins"))));
    assert!(binding.preloaded().is_empty());
}
