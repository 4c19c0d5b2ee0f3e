//! Section templates of generated `.bff` files.
//!
//! Placeholders are rendered by [`crate::generator::template::render`].

pub const FILE_HEADER: &str = r#"//=================================================================================================================
// [projectName] FASTBuild config file
//=================================================================================================================
#once

"#;

pub const DEFINE: &str = "#define [define]\n";

pub const GLOBAL_CONFIGURATION_INCLUDE: &str = r#"
//=================================================================================================================
// Global Configuration include
//=================================================================================================================
#include "[globalSettingsInclude]"
"#;

pub const CUSTOM_SECTION_HEADER: &str = r#"
//=================================================================================================================
// FASTBuild custom section
//=================================================================================================================
"#;

pub const INCLUDES: &str = r#"
//=================================================================================================================
// [projectName] .bff includes
//=================================================================================================================
[orderedIncludes]
"#;

pub const GLOBAL_SETTINGS: &str = r#"
//=================================================================================================================
// Global Settings
//=================================================================================================================
Settings
{
[environments]
    .CachePluginDLL = '[cachePluginDll]'
    .CachePath = '[cachePath]'
    .WorkerConnectionLimit = [workerConnectionLimit]
    .AllowDBMigration_Experimental = [allowDbMigration]
}
"#;

pub const WINDOWS_ENVIRONMENT: &str = r#"#if __WINDOWS__
    #import TMP
    #import TEMP
    #import USERPROFILE
    .Environment =
    {
        "TMP=$TMP$",
        "TEMP=$TEMP$",
        "USERPROFILE=$USERPROFILE$",
        "SystemRoot=[systemRoot]"
    }
#endif
"#;

pub const POSIX_ENVIRONMENT: &str = r#"#if __OSX__
    #import TMPDIR
    .Environment = { "TMPDIR=$TMPDIR$" }
#endif
#if __LINUX__
    #import TMPDIR
    .Environment = { "TMPDIR=$TMPDIR$" }
#endif
"#;

pub const COMPILER_SETTING: &str = r#"
//=================================================================================================================
Compiler( '[compilerName]' )
{
    .ExecutableRootPath     = '[compilerRootPath]'
    .Executable             = '[compilerExecutable]'
    .ExtraFiles             = [compilerExtraFiles]
    .CompilerFamily         = '[compilerFamily]'
}
"#;

pub const COMPILER_CONFIGURATION: &str = r#"
.[configurationName] =
[
    .Compiler               = '[compilerName]'
    .Librarian              = '[librarian]'
    .Linker                 = '[linker]'
    .BaseCompilerOptions    = '[baseOptions]'
    .PlatformIncludePaths   = [platformIncludePaths]
    .PlatformLibPaths       = [platformLibPaths]
]
"#;

pub const PLATFORM_BEGIN: &str = r#"
////////////////////////////////////////////////////////////////////////////////
// PLATFORM SPECIFIC SECTION
#if [define]
"#;

pub const PLATFORM_END: &str = r#"
#endif // [define]
////////////////////////////////////////////////////////////////////////////////
"#;

pub const UNITY_BEGIN: &str = r#"
//=================================================================================================================
// Unity/Blob files (shared across configs)
//=================================================================================================================
"#;

pub const UNITY_SECTION: &str = r#"
Unity( '[unityName]' )
{
    .UnityInputPath                     = [unityInputPath]
    .UnityInputExcludePath              = [unityInputExcludePath]
    .UnityInputPattern                  = [unityInputPattern]
    .UnityInputFiles                    = [unityInputFiles]
    .UnityInputExcludedFiles            = [unityInputExcludedFiles]
    .UnityInputIsolateWritableFiles     = [unityIsolateWritableFiles]
    .UnityInputIsolateWritableFilesLimit = [unityIsolateWritableFilesLimit]
    .UnityOutputPath                    = '[unityOutputPath]'
    .UnityOutputPattern                 = '[unityOutputPattern]'
    .UnityNumFiles                      = [unityNumFiles]
    .UnityPCH                           = '[unityPch]'
}
"#;

pub const RESOURCES_BEGIN: &str = r#"
//=================================================================================================================
ObjectList( '[shortName]_resources' )
{
    Using( [platformConfig] )
    .Intermediate           = '[intermediate]/'
    .CompilerOutputExtension= '.res'
    .CompilerOptions        = '/nologo /fo"%2" "%1"'
    .CompilerOutputPath     = '$Intermediate$'
    .CompilerInputFiles     = [resourceFiles]
"#;

pub const OBJECT_LIST_BEGIN: &str = r#"
//=================================================================================================================
ObjectList( '[nodeName]' )
{
    Using( [platformConfig] )
    .Intermediate           = '[intermediate]/'
"#;

pub const LIBRARY_BEGIN: &str = r#"
//=================================================================================================================
Library( '[nodeName]' )
{
    Using( [platformConfig] )
    .Intermediate           = '[intermediate]/'
"#;

pub const COMPILER_EXTRA_OPTIONS: &str = r#"
    .CompilerExtraOptions   = ''
            + ' $BaseCompilerOptions$'
            + ' [defines]'
            + ' [includePaths]'
            + ' [languageFlag]'
            + ' [exceptionFlag]'
            + ' [clrFlag]'
            + ' [winrtFlag]'
"#;

pub const PCH_OPTIONS: &str = r#"
    // Precompiled Headers options
    // ---------------------------
    .PCHInputFile           = '[pchInputFile]'
    .PCHOutputFile          = '[pchOutputFile]'
    .PCHOptions             = '[pchCreateOptions]'
                            + ' $CompilerExtraOptions$'
"#;

pub const COMPILER_OPTIONS: &str = r#"
    // Compiler options
    // ----------------
    .CompilerOptions        = '[compileOptions]'
                            + ' [pchUseOptions]'
                            + ' $CompilerExtraOptions$'
    .CompilerInputUnity       = '[unityName]'
    .CompilerOutputPath       = '$Intermediate$'
    .CompilerInputPath        = [inputPaths]
    .CompilerInputPattern     = [inputPattern]
    .CompilerInputExcludedFiles = [inputExcludedFiles]
    .CompilerInputFiles       = [sourceFiles]
"#;

pub const PRE_BUILD_DEPENDENCIES: &str = r#"
    .PreBuildDependencies   = [preBuildTargets]
"#;

pub const LIBRARIAN_OPTIONS: &str = r#"
    .LibrarianAdditionalInputs = [librarianAdditionalInputs]
    .LibrarianOutput        = '[outputFile]'
    .LibrarianOptions       = '[librarianOptions]'
"#;

pub const EXE_DLL_BEGIN: &str = r#"
//=================================================================================================================
[nodeKind]( '[nodeName]' )
{
    Using( [platformConfig] )
    .Intermediate           = '[intermediate]/'
    .Libraries              = [libraries]
    .PreBuildDependencies   = [buildOnlyDependencies]
    .LinkerOutput           = '[outputFile]'
    .LinkerLinkObjects      = [linkObjects]
    .LinkerOptions          = '[linkerOptions]'
"#;

pub const END_SECTION: &str = "}\n";

pub const ALIAS_SECTION: &str = r#"
//=================================================================================================================
Alias( '[shortName]' )
{
    .Targets = [targets]
}
"#;

pub const COPY_SECTION: &str = r#"
//=================================================================================================================
Copy( '[copyAlias]' )
{
    .Source = '[copySource]'
    .Dest = '[copyDest]'
}
"#;

pub const EXEC_SECTION: &str = r#"
//=================================================================================================================
Exec( '[stepName]' )
{
    .ExecExecutable         = '[stepExecutable]'
    .ExecInput              = [stepInputs]
    .ExecOutput             = '[stepOutput]'
    .ExecArguments          = '[stepArguments]'
    .ExecWorkingDir         = '[stepWorkingDir]'
    .ExecUseStdOutAsOutput  = [stepUseStdout]
    .ExecAlways             = [stepAlwaysRun]
}
"#;

pub const TEST_SECTION: &str = r#"
//=================================================================================================================
Test( '[stepName]' )
{
    .TestExecutable         = '[stepExecutable]'
    .TestOutput             = '[stepOutput]'
    .TestArguments          = '[stepArguments]'
    .TestWorkingDir         = '[stepWorkingDir]'
}
"#;

pub const ALL_CONFIGS_SECTION: &str = r#"
//=================================================================================================================
// All Configs Alias
//=================================================================================================================
Alias( 'All-Configs' )
{
    .Targets = [configs]
}
"#;

pub const INCLUDE_MASTER_BFF: &str = r#"//=================================================================================================================
// Entry BFF for [solutionName]
//=================================================================================================================
#once
#include "[masterBffPath]"
"#;
