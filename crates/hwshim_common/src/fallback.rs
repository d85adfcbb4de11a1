//! Compiled-in descriptor content.
//!
//! Served whenever the active profile has no usable override. Every value is
//! already in its served form (tab-delimited cpuinfo block, newline-terminated
//! attributes) and fits its descriptor bound with room for the terminator.

pub const CPUINFO: &str = concat!(
    "processor\t: 0\n",
    "vendor_id\t: GenuineIntel\n",
    "cpu family\t: 6\n",
    "model\t\t: 183\n",
    "model name\t: 13th Gen Intel(R) Core(TM) i7-13700K\n",
    "stepping\t: 1\n",
    "microcode\t: 0x2b000181\n",
    "cpu MHz\t\t: 3400.000\n",
    "cache size\t: 30720 KB\n",
    "physical id\t: 0\n",
    "siblings\t: 16\n",
    "core id\t\t: 0\n",
    "cpu cores\t: 8\n",
    "apicid\t\t: 0\n",
    "initial apicid\t: 0\n",
    "fpu\t\t: yes\n",
    "fpu_exception\t: yes\n",
    "cpuid level\t: 27\n",
    "wp\t\t: yes\n",
    "flags\t\t: fpu vme de pse tsc msr pae mce cx8 apic sep mtrr pge mca cmov pat pse36 ",
    "clflush dts acpi mmx fxsr sse sse2 ss ht tm pbe syscall nx pdpe1gb rdtscp lm ",
    "constant_tsc arch_perfmon pebs bts rep_good nopl xtopology nonstop_tsc cpuid ",
    "aperfmperf pni pclmulqdq dtes64 monitor ds_cpl vmx est tm2 ssse3 cx16 xtpr pdcm ",
    "pcid sse4_1 sse4_2 x2apic popcnt tsc_deadline_timer aes xsave avx f16c rdrand ",
    "lahf_lm cpuid_fault epb ssbd ibrs ibpb stibp tpr_shadow vnmi flexpriority ept vpid ",
    "fsgsbase tsc_adjust bmi1 avx2 smep bmi2 erms invpcid rdseed adx smap clflushopt ",
    "clwb intel_pt sha_ni xsaveopt xsavec xgetbv1 xsaves dtherm ida arat pln pts hwp ",
    "hwp_notify hwp_act_window hwp_epp hwp_pkg_req hfi umip pku ospke waitpkg gfni vaes ",
    "vpclmulqdq tme rdpid movdiri movdir64b fsrm md_clear serialize pconfig arch_lbr ",
    "ibt flush_l1d arch_capabilities\n",
    "bogomips\t: 6835.20\n",
    "clflush size\t: 64\n",
    "cache_alignment\t: 64\n",
    "address sizes\t: 46 bits physical, 48 bits virtual\n",
    "power management:\n",
    "\n",
);

pub const SYS_VENDOR: &str = "Intel Corporation\n";

pub const PRODUCT_NAME: &str = "Standard PC\n";

pub const PRODUCT_UUID: &str = "00000000-0000-0000-0000-000000000000\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;

    #[test]
    fn test_fallbacks_fit_their_bounds() {
        for d in Descriptor::ALL {
            let text = d.fallback();
            assert!(text.len() < d.bound(), "{} fallback too long", d);
            assert!(!text.as_bytes().contains(&0));
        }
    }

    #[test]
    fn test_cpuinfo_fallback_layout() {
        assert!(CPUINFO.starts_with("processor\t: 0\n"));
        assert!(CPUINFO.contains("vendor_id\t: GenuineIntel\n"));
        assert!(CPUINFO.contains("model name\t: "));
        assert!(CPUINFO.contains("\nflags\t\t: fpu "));
        for line in CPUINFO.lines().filter(|l| !l.is_empty()) {
            assert!(line.contains(':'), "malformed line: {line}");
        }
    }

    #[test]
    fn test_attribute_fallbacks_are_single_lines() {
        for text in [SYS_VENDOR, PRODUCT_NAME, PRODUCT_UUID] {
            assert!(text.ends_with('\n'));
            assert_eq!(text.matches('\n').count(), 1);
        }
    }
}
